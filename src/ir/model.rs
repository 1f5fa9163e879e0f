use crate::extensions::option::OptionExt;

use serde::de::{Error, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Protocols the generated firmware enables in the IR decoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IrProtocol {
    #[default]
    Nec,
    Sony,
    Rc5,
    Rc6,
    Samsung,
}

impl IrProtocol {
    pub const ALL: [IrProtocol; 5] = [
        IrProtocol::Nec,
        IrProtocol::Sony,
        IrProtocol::Rc5,
        IrProtocol::Rc6,
        IrProtocol::Samsung,
    ];

    /// Name used by the decoder library, both in `DECODE_*` flags and `decode_type_t`.
    pub fn decoder_name(&self) -> &'static str {
        match self {
            IrProtocol::Nec => "NEC",
            IrProtocol::Sony => "SONY",
            IrProtocol::Rc5 => "RC5",
            IrProtocol::Rc6 => "RC6",
            IrProtocol::Samsung => "SAMSUNG",
        }
    }

    /// Maps the protocol word printed by the device onto a protocol.
    ///
    /// Only SONY and RC5 are recognised, anything else is taken as NEC.
    /// RC6 and SAMSUNG are never inferred from a learned line.
    pub fn from_keyword(keyword: &str) -> IrProtocol {
        let keyword = keyword.to_uppercase();
        if keyword.contains("SONY") {
            IrProtocol::Sony
        } else if keyword.contains("RC5") {
            IrProtocol::Rc5
        } else {
            IrProtocol::Nec
        }
    }
}

impl fmt::Display for IrProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.decoder_name())
    }
}

/// Canonical IR command code: `0x` followed by uppercase hex digits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IrCode(String);

impl IrCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IrCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for IrCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

struct CodeVisitor;

impl<'de> Visitor<'de> for CodeVisitor {
    type Value = Option<IrCode>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("Expecting IR code to be a quoted hex string such as \"0x45\".")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: Error,
    {
        Ok(normalize_hex(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: Error,
    {
        Err(E::custom(format!(
            "Expecting IR code to be a quoted hex string such as \"0x45\". Got unquoted number: {}.",
            v
        )))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: Error,
    {
        Err(E::custom(format!(
            "Expecting IR code to be a quoted hex string such as \"0x45\". Got unquoted number: {}.",
            v
        )))
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: Error,
    {
        Ok(None)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: Error,
    {
        Ok(None)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

/// Reads a configured code: quoted text is normalized, and input without hex digits becomes `None`.
///
/// Unquoted numbers are rejected, since YAML has already turned `45` and `0x45` into integers.
pub fn deserialize_code<'de, D>(deserializer: D) -> Result<Option<IrCode>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_option(CodeVisitor)
}

/// Trims, drops an optional `0x` prefix and any non-hex characters.
///
/// Returns `None` when no hex digit is left.
pub fn normalize_hex(raw: &str) -> Option<IrCode> {
    let trimmed = raw.trim();
    let without_prefix = match trimmed.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("0x") => &trimmed[2..],
        _ => trimmed,
    };
    let digits: String = without_prefix
        .chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_uppercase())
        .collect();

    Option::when(!digits.is_empty(), || IrCode(format!("0x{digits}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(raw: &str) -> Option<String> {
        normalize_hex(raw).map(|code| code.to_string())
    }

    #[test]
    fn test_normalize_bare_digits() {
        assert_eq!(normalized("45").as_deref(), Some("0x45"));
    }

    #[test]
    fn test_normalize_uppercases_and_keeps_prefix() {
        assert_eq!(normalized("0x1a").as_deref(), Some("0x1A"));
        assert_eq!(normalized(" 0XbEeF ").as_deref(), Some("0xBEEF"));
    }

    #[test]
    fn test_normalize_rejects_empty_and_non_hex() {
        assert_eq!(normalized(""), None);
        assert_eq!(normalized("zz"), None);
        assert_eq!(normalized("0x"), None);
    }

    #[test]
    fn test_normalize_drops_separators() {
        assert_eq!(normalized("1a-2b").as_deref(), Some("0x1A2B"));
    }

    #[test]
    fn test_normalize_handles_multibyte_prefix() {
        assert_eq!(normalized("é1").as_deref(), Some("0x1"));
    }

    #[test]
    fn test_keyword_inference_is_narrow() {
        assert_eq!(IrProtocol::from_keyword("NEC"), IrProtocol::Nec);
        assert_eq!(IrProtocol::from_keyword("SONY12"), IrProtocol::Sony);
        assert_eq!(IrProtocol::from_keyword("rc5"), IrProtocol::Rc5);
        assert_eq!(IrProtocol::from_keyword("RC6"), IrProtocol::Nec);
        assert_eq!(IrProtocol::from_keyword("SAMSUNG"), IrProtocol::Nec);
    }

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "deserialize_code")]
        code: Option<IrCode>,
    }

    fn read_code(yaml: &str) -> Option<String> {
        let holder: Holder = serde_yaml::from_str(yaml).unwrap();
        holder.code.map(|c| c.to_string())
    }

    #[test]
    fn test_deserialize_code_variants() {
        assert_eq!(read_code("code: \"1a\"").as_deref(), Some("0x1A"));
        assert_eq!(read_code("code: \"45\"").as_deref(), Some("0x45"));
        assert_eq!(read_code("code: \"0x45\"").as_deref(), Some("0x45"));
        assert_eq!(read_code("code: \"zz\"").as_deref(), None);
        assert_eq!(read_code("code: \"\"").as_deref(), None);
        assert_eq!(read_code("code: ~").as_deref(), None);
        assert_eq!(read_code("{}").as_deref(), None);
    }

    #[test]
    fn test_unquoted_codes_are_rejected() {
        for yaml in ["code: 45", "code: 0x45"] {
            let err = serde_yaml::from_str::<Holder>(yaml).err().unwrap();
            assert!(err.to_string().contains("quoted hex string"), "{err}");
        }
    }
}
