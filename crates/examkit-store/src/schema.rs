//! SQLite schema. Applied idempotently on every open.

pub const CURRENT_SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    display_name TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('student', 'instructor'))
);

CREATE TABLE IF NOT EXISTS exams (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0)
);

CREATE TABLE IF NOT EXISTS questions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    exam_id INTEGER NOT NULL,
    text TEXT NOT NULL,
    options TEXT NOT NULL,
    correct_option INTEGER NOT NULL,
    explanation TEXT,
    FOREIGN KEY (exam_id) REFERENCES exams (id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_questions_exam ON questions (exam_id, id);

CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    exam_id INTEGER NOT NULL,
    student_id INTEGER NOT NULL,
    score INTEGER NOT NULL,
    answers TEXT NOT NULL,
    correct_answers TEXT NOT NULL,
    time_spent_secs INTEGER NOT NULL,
    exam_title TEXT NOT NULL,
    total_questions INTEGER NOT NULL,
    submitted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_results_student ON results (student_id, submitted_at);
CREATE INDEX IF NOT EXISTS idx_results_exam ON results (exam_id, submitted_at);

CREATE TABLE IF NOT EXISTS quiz_progress (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    exam_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    answers TEXT NOT NULL,
    last_updated TEXT NOT NULL,
    time_left_secs INTEGER NOT NULL,
    UNIQUE (exam_id, user_id)
);
"#;

/// Accounts created when `seed_demo_users` is set: (username, display name, role).
pub const DEMO_USERS: &[(&str, &str, &str)] = &[
    ("instructor", "Instructor One", "instructor"),
    ("student", "Student One", "student"),
];

pub const DEMO_PASSWORD: &str = "password123";
