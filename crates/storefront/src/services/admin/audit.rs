//! Admin audit trail, written through the `log_admin_activity` function.

use std::fmt::{self, Display};

use serde_json::{Value, json};

use crate::supabase::Datastore;

pub const AUDIT_FUNCTION: &str = "log_admin_activity";

/// Audited admin mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    UpdateUser,
    DeleteUser,
    CreateProduct,
    UpdateProduct,
    DeleteProduct,
    UpdateOrder,
    UpdateContactStatus,
    CreateCategory,
    UpdateCategory,
    DeleteCategory,
}

impl AdminAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UpdateUser => "update_user",
            Self::DeleteUser => "delete_user",
            Self::CreateProduct => "create_product",
            Self::UpdateProduct => "update_product",
            Self::DeleteProduct => "delete_product",
            Self::UpdateOrder => "update_order",
            Self::UpdateContactStatus => "update_contact_status",
            Self::CreateCategory => "create_category",
            Self::UpdateCategory => "update_category",
            Self::DeleteCategory => "delete_category",
        }
    }

    /// Table the audit record points at.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::UpdateUser | Self::DeleteUser => "user_profiles",
            Self::CreateProduct | Self::UpdateProduct | Self::DeleteProduct => "products",
            Self::UpdateOrder => "orders",
            Self::UpdateContactStatus => "contact_submissions",
            Self::CreateCategory | Self::UpdateCategory | Self::DeleteCategory => "categories",
        }
    }
}

impl Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort audit writer. A failed write is logged and otherwise
/// ignored; it never changes the outcome of the mutation it describes.
#[derive(Clone, Copy)]
pub struct AuditLog<'a> {
    db: &'a dyn Datastore,
}

impl<'a> AuditLog<'a> {
    #[must_use]
    pub const fn new(db: &'a dyn Datastore) -> Self {
        Self { db }
    }

    pub async fn record(&self, action: AdminAction, record_id: impl Display, new_values: Option<Value>) {
        let args = json!({
            "p_action": action.as_str(),
            "p_table_name": action.table(),
            "p_record_id": record_id.to_string(),
            "p_new_values": new_values,
        });
        match self.db.rpc(AUDIT_FUNCTION, &args).await {
            Ok(_) => tracing::debug!(%action, "admin activity recorded"),
            Err(e) => tracing::warn!(%action, error = %e, "failed to record admin activity"),
        }
    }
}
