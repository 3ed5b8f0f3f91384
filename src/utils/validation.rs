use crate::errors::{AppError, Result};
use crate::models::b2b_product::PriceTier;
use regex::Regex;

pub struct Validator;

impl Validator {
    pub fn validate_document_urls(urls: &[String]) -> Result<()> {
        if urls.is_empty() {
            return Err(AppError::ValidationError(
                "At least one document URL is required".to_string(),
            ));
        }
        if urls.len() > 10 {
            return Err(AppError::ValidationError(
                "At most 10 document URLs can be submitted".to_string(),
            ));
        }
        let url_regex = Regex::new(r"^https?://[^\s]+$")
            .map_err(|e| AppError::InternalError(format!("Regex error: {}", e)))?;
        for url in urls {
            if url.len() > 2048 || !url_regex.is_match(url) {
                return Err(AppError::ValidationError(format!("Invalid document URL: {}", url)));
            }
        }
        Ok(())
    }

    pub fn validate_min_order_quantity(quantity: i64) -> Result<()> {
        if quantity < 1 {
            return Err(AppError::ValidationError(
                "Minimum order quantity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Tiers must be strictly ascending by quantity with positive decimal
    /// prices; the first tier must not undercut the minimum order quantity.
    pub fn validate_pricing_tiers(tiers: &[PriceTier], min_order_quantity: i64) -> Result<()> {
        let price_regex = Regex::new(r"^\d+(\.\d{1,4})?$")
            .map_err(|e| AppError::InternalError(format!("Regex error: {}", e)))?;
        let mut previous_quantity = 0;
        for tier in tiers {
            if tier.quantity <= previous_quantity {
                return Err(AppError::ValidationError(
                    "Pricing tiers must be strictly ascending by quantity".to_string(),
                ));
            }
            if tier.quantity < min_order_quantity {
                return Err(AppError::ValidationError(
                    "Pricing tier quantity cannot be below the minimum order quantity".to_string(),
                ));
            }
            let has_value = tier.unit_price.chars().any(|c| ('1'..='9').contains(&c));
            if !price_regex.is_match(&tier.unit_price) || !has_value {
                return Err(AppError::ValidationError(format!(
                    "Invalid tier price: {}",
                    tier.unit_price
                )));
            }
            previous_quantity = tier.quantity;
        }
        Ok(())
    }

    pub fn validate_unit_of_measure(unit: &str) -> Result<()> {
        let unit = unit.trim();
        if unit.is_empty() || unit.len() > 30 {
            return Err(AppError::ValidationError(
                "Unit of measure must be 1-30 characters".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_rejection_reason(reason: &str) -> Result<()> {
        if reason.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Rejection reason cannot be empty".to_string(),
            ));
        }
        if reason.len() > 1000 {
            return Err(AppError::ValidationError(
                "Rejection reason must be 1000 characters or less".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(quantity: i64, unit_price: &str) -> PriceTier {
        PriceTier {
            quantity,
            unit_price: unit_price.to_string(),
        }
    }

    #[test]
    fn document_urls_must_be_http() {
        assert!(Validator::validate_document_urls(&["https://cdn.example/doc.pdf".to_string()]).is_ok());
        assert!(Validator::validate_document_urls(&["ftp://cdn.example/doc.pdf".to_string()]).is_err());
        assert!(Validator::validate_document_urls(&[]).is_err());
    }

    #[test]
    fn pricing_tiers_ascending() {
        let ok = vec![tier(10, "9.50"), tier(50, "8.00"), tier(100, "6.75")];
        assert!(Validator::validate_pricing_tiers(&ok, 10).is_ok());

        let duplicate = vec![tier(10, "9.50"), tier(10, "8.00")];
        assert!(Validator::validate_pricing_tiers(&duplicate, 1).is_err());

        let descending = vec![tier(50, "8.00"), tier(10, "9.50")];
        assert!(Validator::validate_pricing_tiers(&descending, 1).is_err());
    }

    #[test]
    fn pricing_tier_below_moq_rejected() {
        let tiers = vec![tier(5, "9.50")];
        assert!(Validator::validate_pricing_tiers(&tiers, 10).is_err());
    }

    #[test]
    fn tier_prices_must_be_decimal() {
        assert!(Validator::validate_pricing_tiers(&[tier(10, "abc")], 1).is_err());
        assert!(Validator::validate_pricing_tiers(&[tier(10, "-4.00")], 1).is_err());
        assert!(Validator::validate_pricing_tiers(&[tier(10, "4.0000")], 1).is_ok());
    }

    #[test]
    fn min_order_quantity_positive() {
        assert!(Validator::validate_min_order_quantity(1).is_ok());
        assert!(Validator::validate_min_order_quantity(0).is_err());
        assert!(Validator::validate_min_order_quantity(-3).is_err());
    }

    #[test]
    fn rejection_reason_not_blank() {
        assert!(Validator::validate_rejection_reason("blurry scan").is_ok());
        assert!(Validator::validate_rejection_reason("   ").is_err());
    }
}
