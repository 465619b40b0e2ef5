mod action;
mod db_op;
mod status;
mod trace;

pub use action::ActionRecord;
pub use db_op::{DbOp, DbOpKey, DbOperation, DecodedDbOp};
pub use status::TraceStatus;
pub use trace::TraceEvent;
