use std::borrow::Cow;
use std::collections::HashMap;

use num_traits::Zero;
use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

lazy_static! {
    static ref EMAIL_VALIDATION_RE: Regex = Regex::new(r"^\S+@\S+\.\S+$").unwrap();
}

pub const PHONE_DIGITS: usize = 10;

fn validation_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError {
        code: Cow::from(code),
        message: Some(Cow::from(message)),
        params: HashMap::new(),
    }
}

pub fn validate_non_negative_reward(reward: &Decimal) -> Result<(), ValidationError> {
    if *reward >= Decimal::zero() {
        Ok(())
    } else {
        Err(validation_error("reward", "Reward must be non negative."))
    }
}

pub fn validate_coupon_code_present(code: &str) -> Result<(), ValidationError> {
    if code.trim().is_empty() {
        Err(validation_error("coupon_code", "Please enter a coupon code"))
    } else {
        Ok(())
    }
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        Err(validation_error("name", "Please enter your name"))
    } else {
        Ok(())
    }
}

/// Any separators are allowed, only the digits are counted.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.trim().is_empty() {
        return Err(validation_error("phone", "Please enter your phone number"));
    }

    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if digits == PHONE_DIGITS {
        Ok(())
    } else {
        Err(validation_error("phone", "Please enter a valid 10-digit phone number"))
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(validation_error("email", "Please enter your email"));
    }

    if EMAIL_VALIDATION_RE.is_match(email.trim()) {
        Ok(())
    } else {
        Err(validation_error("email", "Please enter a valid email address"))
    }
}
