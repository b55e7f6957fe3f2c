//! IPv4 CIDR membership.
//!
//! Addresses are handled as `u32` in network order, most significant octet first.
//! Every call parses its inputs from scratch and keeps nothing between calls.

use crate::error::{
    InvalidAddressSnafu, InvalidNetworkSnafu, MissingArgumentSnafu, ParseError, ParseSnafu,
    ValidationError,
};
use snafu::{ensure, OptionExt, ResultExt};
use std::fmt;
use std::net::Ipv4Addr;
use tracing::{debug, trace};

/// Longest prefix an IPv4 network can have.
pub const MAX_PREFIX_LEN: u8 = 32;

/// An IPv4 network as written in `<address>/<prefix>` notation.
///
/// `base` is kept as written; host bits are not cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Network {
    pub base: u32,
    pub prefix_len: u8,
}

impl Network {
    pub fn contains(&self, addr: u32) -> bool {
        is_member(addr, self.base, self.prefix_len)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", Ipv4Addr::from(self.base), self.prefix_len)
    }
}

fn is_decimal(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a dotted-quad such as `10.10.0.12` into its 32-bit value.
///
/// All four octets must be present and made of decimal digits only.
/// Leading zeros are read as decimal (`010` is 10).
pub fn parse_address(text: &str) -> Result<u32, ParseError> {
    ensure!(
        !text.is_empty(),
        InvalidAddressSnafu {
            text,
            reason: "address is empty",
        }
    );

    let parts: Vec<&str> = text.split('.').collect();
    ensure!(
        parts.len() == 4,
        InvalidAddressSnafu {
            text,
            reason: format!("expected 4 octets, found {}", parts.len()),
        }
    );

    let mut addr = 0u32;
    for part in parts {
        ensure!(
            is_decimal(part),
            InvalidAddressSnafu {
                text,
                reason: format!("octet '{}' is not a decimal number", part),
            }
        );
        let octet: u8 = part.parse().ok().with_context(|| InvalidAddressSnafu {
            text,
            reason: format!("octet {} is out of range 0-255", part),
        })?;
        addr = (addr << 8) | u32::from(octet);
    }

    Ok(addr)
}

/// Parse `<address>/<prefix>` into a [`Network`].
///
/// Exactly one `/` is required; a bare address is rejected rather than read as `/32`.
pub fn parse_network(text: &str) -> Result<Network, ParseError> {
    ensure!(
        !text.is_empty(),
        InvalidNetworkSnafu {
            text,
            reason: "network is empty",
        }
    );

    let parts: Vec<&str> = text.split('/').collect();
    ensure!(
        parts.len() == 2,
        InvalidNetworkSnafu {
            text,
            reason: if parts.len() == 1 {
                "missing '/' between address and prefix length".to_string()
            } else {
                format!("expected one '/', found {}", parts.len() - 1)
            },
        }
    );

    let base = parse_address(parts[0]).map_err(|e| ParseError::InvalidNetwork {
        text: text.to_string(),
        reason: e.to_string(),
    })?;

    ensure!(
        is_decimal(parts[1]),
        InvalidNetworkSnafu {
            text,
            reason: format!("prefix length '{}' is not a decimal number", parts[1]),
        }
    );
    let prefix_len = parts[1]
        .parse::<u8>()
        .ok()
        .filter(|len| *len <= MAX_PREFIX_LEN)
        .with_context(|| InvalidNetworkSnafu {
            text,
            reason: format!("prefix length {} is out of range 0-32", parts[1]),
        })?;

    Ok(Network { base, prefix_len })
}

/// Mask with the top `prefix_len` bits set. Lengths above 32 are treated as 32.
pub fn prefix_mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        // a shift by the full width is not a valid u32 shift
        0
    } else {
        u32::MAX << (MAX_PREFIX_LEN - prefix_len.min(MAX_PREFIX_LEN))
    }
}

/// Returns true if `address` and `network_base` agree on the first `prefix_len` bits.
pub fn is_member(address: u32, network_base: u32, prefix_len: u8) -> bool {
    let mask = prefix_mask(prefix_len);
    trace!(address, network_base, prefix_len, mask, "masked compare");
    (address & mask) == (network_base & mask)
}

/// Check that both arguments are present and non-empty.
///
/// `None` stands for a null coming from a host. The error names every
/// argument that failed the check.
pub fn check_arguments<'a>(
    ip: Option<&'a str>,
    network: Option<&'a str>,
) -> Result<(&'a str, &'a str), ValidationError> {
    let ip = ip.filter(|s| !s.is_empty());
    let network = network.filter(|s| !s.is_empty());
    match (ip, network) {
        (Some(ip), Some(network)) => Ok((ip, network)),
        (None, Some(_)) => MissingArgumentSnafu { names: "ip" }.fail(),
        (Some(_), None) => MissingArgumentSnafu { names: "network" }.fail(),
        (None, None) => MissingArgumentSnafu {
            names: "ip and network",
        }
        .fail(),
    }
}

/// Returns true if `ip` falls within the CIDR range `network`.
///
/// ```
/// use nm_ruleset::builtins::cidr::ip_belongs_to_network;
/// assert!(ip_belongs_to_network("10.10.10.1", "10.10.0.0/16").unwrap());
/// assert!(!ip_belongs_to_network("10.10.10.1", "10.10.0.0/23").unwrap());
/// ```
pub fn ip_belongs_to_network(ip: &str, network: &str) -> Result<bool, ValidationError> {
    let (ip, network) = check_arguments(Some(ip), Some(network))?;
    let addr = parse_address(ip).context(ParseSnafu)?;
    let network = parse_network(network).context(ParseSnafu)?;

    let member = network.contains(addr);
    debug!(ip, %network, member, "checked network membership");
    Ok(member)
}
