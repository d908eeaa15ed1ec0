use serde::Serialize;

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: i32,
    #[serde(skip_serializing)]
    pub quotation_id: i32,
    pub service_name: String,
    pub price: f64,
    pub discount: f64,
    pub grand_total: f64,
}

/// Column values of a service row, without its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceFields {
    pub service_name: String,
    pub price: f64,
    pub discount: f64,
    pub grand_total: f64,
}

impl Service {
    pub fn from_fields(id: i32, quotation_id: i32, fields: ServiceFields) -> Self {
        Self {
            id,
            quotation_id,
            service_name: fields.service_name,
            price: fields.price,
            discount: fields.discount,
            grand_total: fields.grand_total,
        }
    }
}
