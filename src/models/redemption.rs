//! Consumer-facing redemption form and its outcome
use rust_decimal::Decimal;
use validator::ValidationError;

use models::coupons::CouponCode;
use models::validation_rules::*;

pub const REDEEMED_MESSAGE: &str = "Coupon redeemed successfully!";
pub const INVALID_CODE_MESSAGE: &str = "Invalid coupon code. Please check and try again.";
pub const ALREADY_USED_MESSAGE: &str = "This coupon has already been used and cannot be redeemed again.";
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";
pub const BUSY_MESSAGE: &str = "This coupon is being redeemed right now. Please try again.";

/// Payload of the redemption form, accepted as JSON or urlencoded fields
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionForm {
    #[serde(default)]
    pub coupon_code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl RedemptionForm {
    /// Checks the fields in the order they appear on the form and
    /// reports the first one that is wrong.
    pub fn validate_in_order(&self) -> Result<(), ValidationError> {
        validate_coupon_code_present(&self.coupon_code)?;
        validate_name(&self.name)?;
        validate_phone(&self.phone)?;
        validate_email(&self.email)?;
        Ok(())
    }

    pub fn code(&self) -> CouponCode {
        CouponCode::normalize(&self.coupon_code)
    }

    pub fn claimant(&self) -> Claimant {
        Claimant {
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
        }
    }
}

/// Identifying details of the consumer redeeming a coupon
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Claimant {
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_amount: Option<Decimal>,
}

impl RedemptionResult {
    pub fn redeemed(reward_amount: Decimal) -> Self {
        Self {
            success: true,
            message: REDEEMED_MESSAGE.to_string(),
            reward_amount: Some(reward_amount),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            reward_amount: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(code: &str, name: &str, phone: &str, email: &str) -> RedemptionForm {
        RedemptionForm {
            coupon_code: code.to_string(),
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn test_missing_name_reported_before_bad_email() {
        let err = form("ABC12345", "", "9999999999", "bad").validate_in_order().unwrap_err();
        assert_eq!(err.code, "name");
        assert_eq!(err.message.unwrap(), "Please enter your name");
    }

    #[test]
    fn test_code_checked_first() {
        let err = form(" ", "", "", "").validate_in_order().unwrap_err();
        assert_eq!(err.message.unwrap(), "Please enter a coupon code");
    }

    #[test]
    fn test_phone_checked_before_email() {
        let err = form("ABC12345", "Asha", "12345", "bad").validate_in_order().unwrap_err();
        assert_eq!(err.code, "phone");
    }

    #[test]
    fn test_valid_form() {
        assert!(form("wxwxwxwx", "Asha", "98765-43210", "a@b.com").validate_in_order().is_ok());
    }

    #[test]
    fn test_code_is_normalized() {
        let form = form(" wxwxwxwx ", "Asha", "9876543210", "a@b.com");
        assert_eq!(form.code(), CouponCode("WXWXWXWX".to_string()));
    }

    #[test]
    fn test_form_reads_camel_case_fields() {
        let form: RedemptionForm =
            ::serde_json::from_str(r#"{"couponCode":"A","name":"B","phone":"1","email":"e"}"#).unwrap();
        assert_eq!(form.coupon_code, "A");
    }
}
