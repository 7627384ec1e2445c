use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool '{0}' is not registered")]
    UnknownTool(String),

    #[error("tool name '{tool}' rejected by safety guard: {reason}")]
    BlockedName { tool: String, reason: String },

    #[error("schema compile error for tool '{tool}': {message}")]
    SchemaCompile { tool: String, message: String },

    #[error("parameter validation failed for tool '{tool}': {errors}")]
    ParamsInvalid { tool: String, errors: String },

    #[error("invalid CRM record id: {0}")]
    InvalidRecordId(String),

    #[error("invalid search field name: {0}")]
    InvalidFieldName(String),

    #[error("executor transport error: {0}")]
    Transport(String),
}
