mod admin;
mod input;
mod installment;
mod quotation;
mod service;

pub use admin::Admin;
pub use input::{QuotationInput, ValidationError};
pub use installment::{Installment, InstallmentFields};
pub use quotation::{Quotation, QuotationDetail, QuotationDraft, QuotationHeader};
pub use service::{Service, ServiceFields};
