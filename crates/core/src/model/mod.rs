mod catalog;
mod completion;
mod ids;
mod level;
mod role;
mod subject;

pub use ids::{ParseIdError, QuestionId, UserId};

pub use catalog::{Catalog, CatalogError, QuestionCount, Subtopic, TopicGroup};
pub use completion::{CompletionKey, CompletionSet, KEY_SEPARATOR, ParseCompletionKeyError};
pub use level::Level;
pub use role::{AccessError, ParseRoleError, RequestContext, Role};
pub use subject::{ParseSubjectError, Subject};
