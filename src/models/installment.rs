use serde::Serialize;

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub id: i32,
    #[serde(skip_serializing)]
    pub quotation_id: i32,
    pub label: String,
    pub due_when: String,
    pub installment_amount: f64,
}

/// Column values of an installment row, without its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentFields {
    pub label: String,
    pub due_when: String,
    pub installment_amount: f64,
}

impl Installment {
    pub fn from_fields(id: i32, quotation_id: i32, fields: InstallmentFields) -> Self {
        Self {
            id,
            quotation_id,
            label: fields.label,
            due_when: fields.due_when,
            installment_amount: fields.installment_amount,
        }
    }
}
