pub mod classify;
pub mod index;
pub mod parsing;
pub mod publish;
pub mod statement;
pub mod summary;
pub mod validate;

pub use classify::{classify, extract, ExtractError, Statement};
pub use index::{FilingDescriptor, ReportForm};
pub use publish::{should_publish, ArtifactFormat, ArtifactKey, PublishDecision};
pub use statement::{ArtifactKind, Scope, StatementKind, Taxonomy};
pub use summary::{BsSummary, CfSummary, Fundamental, PlSummary, StatementMeta};
pub use validate::ValidationOutcome;
