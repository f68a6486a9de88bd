//! Row types for the SQLite schema, serialized as-is in API responses
//! and WebSocket event payloads.

use serde::Serialize;

/// User record. The id is the Google OAuth subject and doubles as the
/// session token.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub business_type: Option<String>,
    pub occupation: Option<String>,
    pub monthly_budget: f64,
    pub onboarding_completed: bool,
    pub dark_mode: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            full_name: row.get(2)?,
            avatar_url: row.get(3)?,
            business_type: row.get(4)?,
            occupation: row.get(5)?,
            monthly_budget: row.get(6)?,
            onboarding_completed: row.get(7)?,
            dark_mode: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

/// Column list matching `User::from_row`.
pub const USER_COLUMNS: &str = "id, email, full_name, avatar_url, business_type, occupation, \
     monthly_budget, onboarding_completed, dark_mode, created_at, updated_at";

/// Expense category. Default categories have no owner and are read-only.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub color: String,
    pub is_default: bool,
    pub created_at: String,
}

impl Category {
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            color: row.get(3)?,
            is_default: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

/// Column list matching `Category::from_row`.
pub const CATEGORY_COLUMNS: &str = "id, user_id, name, color, is_default, created_at";

/// Expense record with its category joined in, as returned by the API and
/// carried in expense event payloads.
#[derive(Debug, Clone, Serialize)]
pub struct Expense {
    pub id: String,
    pub user_id: String,
    pub category_id: Option<String>,
    pub category: Option<Category>,
    pub amount: f64,
    pub description: Option<String>,
    pub expense_date: String,
    pub receipt_url: Option<String>,
    pub attachment_type: Option<String>,
    pub attachment_data: Option<String>,
    pub ai_processed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Expense {
    /// Map a joined row: expense columns first, then the (possibly NULL)
    /// category columns from a LEFT JOIN.
    pub fn from_joined_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let category = match row.get::<_, Option<String>>(12)? {
            Some(id) => Some(Category {
                id,
                user_id: row.get(13)?,
                name: row.get(14)?,
                color: row.get(15)?,
                is_default: row.get(16)?,
                created_at: row.get(17)?,
            }),
            None => None,
        };

        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            category_id: row.get(2)?,
            category,
            amount: row.get(3)?,
            description: row.get(4)?,
            expense_date: row.get(5)?,
            receipt_url: row.get(6)?,
            attachment_type: row.get(7)?,
            attachment_data: row.get(8)?,
            ai_processed: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

/// SELECT prefix matching `Expense::from_joined_row`.
pub const EXPENSE_JOIN_SELECT: &str = "SELECT e.id, e.user_id, e.category_id, e.amount, e.description, e.expense_date, \
     e.receipt_url, e.attachment_type, e.attachment_data, e.ai_processed, \
     e.created_at, e.updated_at, \
     c.id, c.user_id, c.name, c.color, c.is_default, c.created_at \
     FROM expenses e LEFT JOIN categories c ON c.id = e.category_id";
