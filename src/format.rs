use primitive_types::U256;

use crate::error::WalletError;

pub const DEFAULT_VISIBLE_CHARS: usize = 4;

const ETHER_DECIMALS: usize = 18;
const DISPLAY_DECIMALS: usize = 6;
const DUST_THRESHOLD: f64 = 0.000001;

/// Render a decimal balance with six decimal places.
///
/// Zero renders as `0.000000`; anything positive below `0.000001` renders as
/// `< 0.000001`.
pub fn format_balance(balance: &str) -> Result<String, WalletError> {
    let value: f64 = balance
        .trim()
        .parse()
        .map_err(|_| WalletError::InvalidBalance(balance.to_string()))?;

    if !value.is_finite() || value < 0.0 {
        return Err(WalletError::InvalidBalance(balance.to_string()));
    }

    if value == 0.0 {
        return Ok(format!("{:.*}", DISPLAY_DECIMALS, 0.0));
    }
    if value < DUST_THRESHOLD {
        return Ok(format!("< {:.*}", DISPLAY_DECIMALS, DUST_THRESHOLD));
    }

    // Plain decimal input is rounded digit by digit; anything else goes
    // through the float's shortest decimal rendering.
    let trimmed = balance.trim();
    let is_plain = trimmed.bytes().all(|b| b.is_ascii_digit() || b == b'.');
    let digits = if is_plain { trimmed.to_string() } else { value.to_string() };
    Ok(round_half_up(&digits, DISPLAY_DECIMALS))
}

/// Round an unsigned decimal string to `places` fraction digits, ties away from zero.
fn round_half_up(decimal: &str, places: usize) -> String {
    let (int_part, frac_part) = decimal.split_once('.').unwrap_or((decimal, ""));
    let int_part = int_part.trim_start_matches('0');

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(places))
        .map(|b| b - b'0')
        .collect();

    if frac_part.as_bytes().get(places).map_or(false, |&b| b >= b'5') {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, 1);
                break;
            }
            i -= 1;
            if digits[i] == 9 {
                digits[i] = 0;
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let rendered: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
    let (whole, frac) = rendered.split_at(rendered.len() - places);
    format!("{}.{}", if whole.is_empty() { "0" } else { whole }, frac)
}

/// `0x742C4A...` style shortening: the first `visible + 2` and last `visible` characters.
pub fn shorten_address(address: &str, visible: usize) -> String {
    let len = address.chars().count();
    if len <= visible * 2 + 2 {
        return address.to_string();
    }

    let head: String = address.chars().take(visible + 2).collect();
    let tail: String = address.chars().skip(len - visible).collect();
    format!("{}...{}", head, tail)
}

/// Exact decimal rendering of a wei amount in ether.
pub fn wei_to_ether(wei: U256) -> String {
    let (whole, frac) = wei.div_mod(U256::exp10(ETHER_DECIMALS));
    let frac = format!("{:0>width$}", frac.to_string(), width = ETHER_DECIMALS);
    let frac = frac.trim_end_matches('0');

    if frac.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, frac)
    }
}
