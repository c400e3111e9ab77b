//! Extraction adapter: ask the vision model to read a stored receipt

use chrono::{Local, NaiveDateTime};
use receiptly_core::models::{ParsedReceipt, ReceiptRecord};
use receiptly_core::AppError;
use receiptly_services::{Category, LedgerClient, LedgerError, VisionClient, VisionRequest};
use receiptly_storage::Storage;
use std::sync::Arc;

use crate::session::StoredUpload;

/// Fixed extraction instruction, including the category names the model
/// must choose from.
pub fn build_prompt(categories: &[Category], now: NaiveDateTime) -> String {
    let category_names = categories
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Extract the following information from this receipt: date, total amount, \
         merchant name, currency code, category and notes. If the merchant is part of a \
         store chain (e.g., Jumbo, Albert Heijn), include only the chain name. \
         The receipt is relatively recent, today is {today}. \
         Return ONLY a valid JSON object with the following keys: \
         'date' (ISO 8601, with as much detail as the receipt shows), \
         'total' (a bare number using a dot as decimal separator, no currency symbol), \
         'merchant' (used as the expense description), \
         'currency_code' (ISO 4217, e.g. 'EUR', 'USD'), \
         'notes' (specific details such as an invoice number, payment period or the store \
         branch; also a short description of the purchase if it is not groceries), \
         'category' (exactly one of the following category names, the most appropriate):\n\
         {category_names}\n\n\
         DO NOT INCLUDE any explanation, markdown or extra text. \
         Example: {{\"date\": \"{example_date}\", \"total\": 12.34, \"merchant\": \"Store Name\", \
         \"currency_code\": \"EUR\", \"category\": \"Food and drink / Groceries\", \"notes\": \"\"}}",
        today = now.format("%Y-%m-%d"),
        category_names = category_names,
        example_date = now.format("%Y-%m-%dT%H:%M"),
    )
}

#[derive(Clone)]
pub struct ExtractionService {
    storage: Arc<dyn Storage>,
    vision: Arc<dyn VisionClient>,
    ledger: Arc<dyn LedgerClient>,
    fallback_currency: String,
}

impl ExtractionService {
    pub fn new(
        storage: Arc<dyn Storage>,
        vision: Arc<dyn VisionClient>,
        ledger: Arc<dyn LedgerClient>,
        fallback_currency: String,
    ) -> Self {
        Self {
            storage,
            vision,
            ledger,
            fallback_currency,
        }
    }

    /// Read the stored receipt with the vision model.
    ///
    /// Only a failing vision call is an error (`ExtractionUnavailable`);
    /// incomplete or malformed answers degrade to field defaults.
    #[tracing::instrument(skip(self, upload, access_token), fields(upload_id = %upload.handle.id))]
    pub async fn extract(
        &self,
        upload: &StoredUpload,
        access_token: &str,
    ) -> Result<ParsedReceipt, AppError> {
        let data = self.storage.download(&upload.storage_key).await?;

        let categories = match self.ledger.categories(access_token).await {
            Ok(categories) => categories,
            Err(LedgerError::Unauthorized(_)) => return Err(AppError::NotAuthenticated),
            Err(e) => {
                tracing::warn!(error = %e, "Category list unavailable, extracting without it");
                Vec::new()
            }
        };

        let now = Local::now().naive_local();
        let request = VisionRequest {
            prompt: build_prompt(&categories, now),
            filename: upload.handle.original_filename.clone(),
            mime_type: upload.handle.mime_type.clone(),
            data,
        };

        let start = std::time::Instant::now();
        let raw = self.vision.extract(request).await?;

        let parsed = ReceiptRecord::from_model_output(&raw, &self.fallback_currency, now);
        if parsed.defaulted_fields.is_empty() {
            tracing::info!(
                duration_ms = start.elapsed().as_millis() as u64,
                "Receipt extracted"
            );
        } else {
            tracing::warn!(
                duration_ms = start.elapsed().as_millis() as u64,
                defaulted_fields = ?parsed.defaulted_fields,
                "Receipt extracted with defaulted fields"
            );
        }

        Ok(parsed)
    }
}
