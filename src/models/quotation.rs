use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::{Installment, InstallmentFields, Service, ServiceFields};
use crate::reconcile::Desired;

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub gender: String,
    pub domain: String,
    pub date: Option<NaiveDate>,
    pub total: f64,
    pub total_discount: f64,
    pub final_amount: f64,
    pub total_service: i32,
    pub input_count: i32,
}

/// Header columns of a quotation as written by create and update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuotationHeader {
    pub name: String,
    pub email: String,
    pub gender: String,
    pub domain: String,
    pub date: Option<NaiveDate>,
    pub total: f64,
    pub total_discount: f64,
    pub final_amount: f64,
    pub total_service: i32,
    pub input_count: i32,
}

impl Quotation {
    pub fn from_header(id: i32, header: QuotationHeader) -> Self {
        Self {
            id,
            name: header.name,
            email: header.email,
            gender: header.gender,
            domain: header.domain,
            date: header.date,
            total: header.total,
            total_discount: header.total_discount,
            final_amount: header.final_amount,
            total_service: header.total_service,
            input_count: header.input_count,
        }
    }
}

/// A validated create/update request: the header plus the desired child rows.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotationDraft {
    pub header: QuotationHeader,
    pub services: Vec<Desired<ServiceFields>>,
    pub installments: Vec<Desired<InstallmentFields>>,
}

impl QuotationDraft {
    /// Drops client-supplied child ids so every child row is inserted fresh.
    pub fn without_row_ids(mut self) -> Self {
        for service in &mut self.services {
            service.id = None;
        }
        for installment in &mut self.installments {
            installment.id = None;
        }
        self
    }
}

/// A quotation together with its child rows, as returned by the list and
/// single-quotation endpoints.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotationDetail {
    #[serde(flatten)]
    pub quotation: Quotation,
    pub services: Vec<Service>,
    pub installments: Vec<Installment>,
    pub total_services: usize,
    pub total_installment: usize,
}

impl QuotationDetail {
    pub fn new(quotation: Quotation, services: Vec<Service>, installments: Vec<Installment>) -> Self {
        Self {
            total_services: services.len(),
            total_installment: installments.len(),
            quotation,
            services,
            installments,
        }
    }

    /// Groups child rows under their quotations.
    ///
    /// Quotation order is kept, and so is the order of children within each
    /// quotation. Quotations without children are still returned; children
    /// whose quotation is missing are dropped.
    pub fn assemble(
        quotations: Vec<Quotation>,
        services: Vec<Service>,
        installments: Vec<Installment>,
    ) -> Vec<Self> {
        let mut services_by_quotation: HashMap<i32, Vec<Service>> = HashMap::new();
        for service in services {
            services_by_quotation
                .entry(service.quotation_id)
                .or_default()
                .push(service);
        }

        let mut installments_by_quotation: HashMap<i32, Vec<Installment>> = HashMap::new();
        for installment in installments {
            installments_by_quotation
                .entry(installment.quotation_id)
                .or_default()
                .push(installment);
        }

        quotations
            .into_iter()
            .map(|quotation| {
                let services = services_by_quotation.remove(&quotation.id).unwrap_or_default();
                let installments = installments_by_quotation
                    .remove(&quotation.id)
                    .unwrap_or_default();
                Self::new(quotation, services, installments)
            })
            .collect()
    }
}
