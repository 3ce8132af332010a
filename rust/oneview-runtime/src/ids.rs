use uuid::Uuid;

/// A process-unique token: UUID v4 in simple (32 hex chars) form.
pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}
