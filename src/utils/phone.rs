/// Country calling code substituted for the trunk `0` of local numbers.
pub const DEFAULT_COUNTRY_CODE: &str = "27";

/// Converts a mobile number to the digits-only international form used for
/// storage and lookup, e.g. `082 123 4567` -> `27821234567`.
///
/// Numbers already carrying a country code (with or without `+`/`00`) keep it.
pub fn convert_to_international_format(number: &str) -> String {
    let trimmed = number.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();

    if trimmed.starts_with('+') {
        return digits;
    }
    if let Some(rest) = digits.strip_prefix("00") {
        return rest.to_string();
    }
    if let Some(rest) = digits.strip_prefix('0') {
        return format!("{}{}", DEFAULT_COUNTRY_CODE, rest);
    }
    digits
}
