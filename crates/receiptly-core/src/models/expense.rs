use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::models::receipt::ReceiptRecord;

/// A member of a ledger group, as reported by the ledger service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GroupMember {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl GroupMember {
    pub fn display_name(&self) -> String {
        match self.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

/// The amount one group member owes for an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ParticipantShare {
    pub member: GroupMember,
    #[schema(value_type = f64)]
    pub owed: Decimal,
}

/// Expense to be created in the ledger, split equally across a group.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseRequest {
    pub group_id: i64,
    pub receipt: ReceiptRecord,
    /// Ledger category id resolved from `receipt.category`, if any.
    pub category_id: Option<i64>,
    /// Ledger user who paid the full amount.
    pub paid_by: i64,
    pub shares: Vec<ParticipantShare>,
}

impl ExpenseRequest {
    /// Build an equal-split request over every current member of the group.
    pub fn equal_split(
        receipt: ReceiptRecord,
        group_id: i64,
        members: Vec<GroupMember>,
        category_id: Option<i64>,
        paid_by: i64,
    ) -> Result<Self, AppError> {
        if members.is_empty() {
            return Err(AppError::SubmissionFailed(format!(
                "group {} has no members to split the expense with",
                group_id
            )));
        }

        let amounts = split_equally(receipt.total, members.len());
        let shares = members
            .into_iter()
            .zip(amounts)
            .map(|(member, owed)| ParticipantShare { member, owed })
            .collect();

        Ok(ExpenseRequest {
            group_id,
            receipt,
            category_id,
            paid_by,
            shares,
        })
    }

    pub fn description(&self) -> &str {
        &self.receipt.merchant
    }

    /// Summary shown to the user once the ledger accepted the expense.
    pub fn confirmation_text(&self) -> String {
        let receipt = &self.receipt;
        let mut lines = vec![
            format!("Expense created: {}", receipt.merchant),
            format!("- Amount: {:.2} {}", receipt.total, receipt.currency_code),
            format!("- Date: {}", receipt.date.format("%B %d, %Y, %H:%M")),
            format!(
                "- Category: {}",
                receipt.category.as_deref().unwrap_or("Not available")
            ),
            format!(
                "- Notes: {}",
                receipt.notes.as_deref().unwrap_or("Not available")
            ),
            format!("Split equally between {} members:", self.shares.len()),
        ];
        lines.extend(self.shares.iter().map(|share| {
            format!(
                "- {} owes {:.2} {}",
                share.member.display_name(),
                share.owed,
                receipt.currency_code
            )
        }));
        lines.join("\n")
    }
}

/// Terminal outcome of a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExpenseResult {
    pub expense_id: String,
    pub human_readable_confirmation: String,
}

/// Divide `total` into `count` cent-precise shares that sum exactly to it.
///
/// Leftover cents go one each to the first shares.
pub fn split_equally(total: Decimal, count: usize) -> Vec<Decimal> {
    if count == 0 {
        return Vec::new();
    }
    let cent = Decimal::new(1, 2);
    let total = total.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let n = Decimal::from(count as u64);
    let base = (total / n).round_dp_with_strategy(2, RoundingStrategy::ToZero);
    let mut remainder = total - base * n;

    (0..count)
        .map(|_| {
            if remainder >= cent {
                remainder -= cent;
                base + cent
            } else {
                base
            }
        })
        .collect()
}
