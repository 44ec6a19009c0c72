pub mod use_cases;

pub use use_cases::user_import::{ImportOutcome, UserImportUseCase};
