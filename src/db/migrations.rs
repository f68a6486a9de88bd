use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Uses SQLite user_version pragma for tracking — no migration table needed.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(
            "-- Migration 1: Initial schema

CREATE TABLE users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    full_name TEXT,
    avatar_url TEXT,
    business_type TEXT,
    occupation TEXT,
    monthly_budget REAL NOT NULL DEFAULT 0,
    onboarding_completed INTEGER NOT NULL DEFAULT 0,
    dark_mode INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX idx_users_email ON users(email);

CREATE TABLE categories (
    id TEXT PRIMARY KEY,
    user_id TEXT REFERENCES users(id),
    name TEXT NOT NULL,
    color TEXT NOT NULL,
    is_default INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX idx_categories_user ON categories(user_id);

CREATE TABLE expenses (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    category_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
    amount REAL NOT NULL,
    description TEXT,
    expense_date TEXT NOT NULL,
    receipt_url TEXT,
    attachment_type TEXT,
    attachment_data TEXT,
    ai_processed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX idx_expenses_user_date ON expenses(user_id, expense_date);
CREATE INDEX idx_expenses_category ON expenses(category_id);
",
        ),
        M::up(
            "-- Migration 2: Seed default categories (shared across all users)

INSERT INTO categories (id, user_id, name, color, is_default, created_at) VALUES
    ('0193b001-0000-7000-8000-000000000001', NULL, 'Makanan & Minuman', '#F59E0B', 1, '2024-12-01T00:00:00Z'),
    ('0193b001-0000-7000-8000-000000000002', NULL, 'Transportasi', '#3B82F6', 1, '2024-12-01T00:00:00Z'),
    ('0193b001-0000-7000-8000-000000000003', NULL, 'Belanja', '#EC4899', 1, '2024-12-01T00:00:00Z'),
    ('0193b001-0000-7000-8000-000000000004', NULL, 'Hiburan', '#8B5CF6', 1, '2024-12-01T00:00:00Z'),
    ('0193b001-0000-7000-8000-000000000005', NULL, 'Kesehatan', '#10B981', 1, '2024-12-01T00:00:00Z'),
    ('0193b001-0000-7000-8000-000000000006', NULL, 'Pendidikan', '#6366F1', 1, '2024-12-01T00:00:00Z'),
    ('0193b001-0000-7000-8000-000000000007', NULL, 'Tagihan', '#EF4444', 1, '2024-12-01T00:00:00Z'),
    ('0193b001-0000-7000-8000-000000000008', NULL, 'Lainnya', '#6B7280', 1, '2024-12-01T00:00:00Z');
",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_valid() {
        assert!(migrations().validate().is_ok());
    }
}
