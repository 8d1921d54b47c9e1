use chrono::{Months, NaiveDate};
use serde::Serialize;

use super::domain::format_amount;
use super::service::BillingError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Installment {
    pub sequence: u32,
    pub due_on: NaiveDate,
    pub amount: i64,
}

/// Monthly split of a total. The rounding remainder lands on the first installment so
/// later installments are all equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentPlan {
    pub total: i64,
    pub currency: String,
    pub installments: Vec<Installment>,
}

impl PaymentPlan {
    pub fn new(
        total: i64,
        currency: impl Into<String>,
        count: u32,
        first_due: NaiveDate,
    ) -> Result<Self, BillingError> {
        if total <= 0 {
            return Err(BillingError::Validation(
                "plan total must be positive".to_string(),
            ));
        }
        if count == 0 {
            return Err(BillingError::Validation(
                "plan needs at least one installment".to_string(),
            ));
        }

        let share = total / i64::from(count);
        let remainder = total % i64::from(count);
        let installments = (0..count)
            .map(|index| {
                let due_on = first_due
                    .checked_add_months(Months::new(index))
                    .ok_or_else(|| {
                        BillingError::Validation(format!(
                            "installment {} falls outside the calendar",
                            index + 1
                        ))
                    })?;
                let amount = if index == 0 { share + remainder } else { share };
                Ok(Installment {
                    sequence: index + 1,
                    due_on,
                    amount,
                })
            })
            .collect::<Result<Vec<_>, BillingError>>()?;

        Ok(Self {
            total,
            currency: currency.into(),
            installments,
        })
    }

    pub fn summary(&self) -> String {
        let per = self
            .installments
            .last()
            .map(|installment| installment.amount)
            .unwrap_or_default();
        format!(
            "{} in {} monthly installments of {}",
            format_amount(self.total, &self.currency),
            self.installments.len(),
            format_amount(per, &self.currency)
        )
    }
}
