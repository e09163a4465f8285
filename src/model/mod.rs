pub mod config;
pub mod deal;
pub mod extraction;
pub mod statement;

pub use config::{Config, ScheduleSettings};
pub use deal::{DealOwner, DealProfile, LoanType};
pub use extraction::{
    ArchivedFile, ArchivedFolder, DealConfidence, DealExtraction, StatementConfidence,
    StatementExtraction, UploadedFile,
};
pub use statement::{BankStatement, FundingPosition, PaymentFrequency};
