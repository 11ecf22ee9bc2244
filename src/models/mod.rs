mod job;
mod project;
mod report;
mod run;
mod workflow;

pub use self::job::*;
pub use self::project::*;
pub use self::report::*;
pub use self::run::*;
pub use self::workflow::*;
