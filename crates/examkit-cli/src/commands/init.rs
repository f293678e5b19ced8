//! The `examkit init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("examkit.toml").exists() {
        println!("examkit.toml already exists, skipping.");
    } else {
        std::fs::write("examkit.toml", SAMPLE_CONFIG)?;
        println!("Created examkit.toml");
    }

    std::fs::create_dir_all("exams")?;
    let example_path = std::path::Path::new("exams/example.toml");
    if example_path.exists() {
        println!("exams/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_EXAM)?;
        println!("Created exams/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: examkit validate --exams exams/example.toml");
    println!("  2. Run: examkit import --exams exams --user instructor --password password123");
    println!("  3. Run: examkit take 1 --user student --password password123");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examkit configuration

[database]
url = "sqlite://examkit.db"
max_connections = 4
# Creates instructor/student accounts with password "password123".
seed_demo_users = true

[session]
tick_ms = 1000
# Save progress every N seconds while answers exist; 0 disables.
checkpoint_every_secs = 10
"#;

const EXAMPLE_EXAM: &str = r#"[exam]
title = "Example Exam"
duration_minutes = 5

[[questions]]
text = "What is 2 + 2?"
options = ["3", "4", "5"]
correct = 1
explanation = "Two plus two is four."

[[questions]]
text = "Which planet is known as the red planet?"
options = ["Venus", "Jupiter", "Mars", "Mercury"]
correct = 2
"#;
