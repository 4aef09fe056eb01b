//! Brazilian taxpayer documents: CPF for affiliates, CNPJ for companies.
//!
//! Both carry two trailing check digits computed as a weighted sum modulo 11.
//! Inputs may contain the usual punctuation (`123.456.789-09`,
//! `12.345.678/0001-95`); it is stripped before validation and storage.

use validator::ValidationError;

const CNPJ_FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn to_digits(value: &str) -> Vec<u32> {
    value.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        0 | 1 => 0,
        rest => 11 - rest,
    }
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|pair| pair[0] == pair[1])
}

pub fn is_valid_cpf(value: &str) -> bool {
    let digits = to_digits(&digits_only(value));
    if digits.len() != 11 || all_same(&digits) {
        return false;
    }

    let first_weights: Vec<u32> = (2..=10).rev().collect();
    let second_weights: Vec<u32> = (2..=11).rev().collect();

    check_digit(&digits[..9], &first_weights) == digits[9] && check_digit(&digits[..10], &second_weights) == digits[10]
}

pub fn is_valid_cnpj(value: &str) -> bool {
    let digits = to_digits(&digits_only(value));
    if digits.len() != 14 || all_same(&digits) {
        return false;
    }

    check_digit(&digits[..12], &CNPJ_FIRST_WEIGHTS) == digits[12] && check_digit(&digits[..13], &CNPJ_SECOND_WEIGHTS) == digits[13]
}

pub fn validate_cpf(value: &str) -> Result<(), ValidationError> {
    if is_valid_cpf(value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_cpf"))
    }
}

pub fn validate_cnpj(value: &str) -> Result<(), ValidationError> {
    if is_valid_cnpj(value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_cnpj"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_cpf_with_and_without_punctuation() {
        assert!(is_valid_cpf("529.982.247-25"));
        assert!(is_valid_cpf("52998224725"));
    }

    #[test]
    fn rejects_cpf_with_wrong_check_digit() {
        assert!(!is_valid_cpf("529.982.247-26"));
    }

    #[test]
    fn rejects_repeated_digit_cpf() {
        assert!(!is_valid_cpf("111.111.111-11"));
    }

    #[test]
    fn rejects_cpf_with_wrong_length() {
        assert!(!is_valid_cpf("5299822472"));
        assert!(!is_valid_cpf(""));
    }

    #[test]
    fn accepts_valid_cnpj() {
        assert!(is_valid_cnpj("11.222.333/0001-81"));
        assert!(is_valid_cnpj("11222333000181"));
    }

    #[test]
    fn rejects_invalid_cnpj() {
        assert!(!is_valid_cnpj("11.222.333/0001-82"));
        assert!(!is_valid_cnpj("00000000000000"));
        assert!(!is_valid_cnpj("1122233300018"));
    }

    #[test]
    fn digits_only_strips_punctuation() {
        assert_eq!(digits_only("529.982.247-25"), "52998224725");
    }
}
