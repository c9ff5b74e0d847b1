mod issue;
mod project;
mod ticket;
mod user;

pub use issue::{CustomField, CustomFieldValue, RawIssue};
pub use project::Project;
pub use ticket::{issue_url, null_as_default, Ticket, FIELD_PRIORITY, FIELD_SPRINTS, FIELD_TYPE};
pub use user::UserProfile;
