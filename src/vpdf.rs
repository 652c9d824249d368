use std::fmt::Display;
use crate::error::PDFError;

macro_rules! pdf_version {
    ($(($name:ident,$version:literal)),+$(,)?) => {
        #[derive(PartialEq, Eq, Debug, Clone, Copy)]
        pub enum PDFVersion{
        $(
            $name,
        )+
        }

        impl PDFVersion {
            /// The `x.y` label as written after `%PDF-` in the file header.
            pub fn label(&self) -> &'static str {
                match self {
                    $(
                        PDFVersion::$name => $version,
                    )+
                }
            }
        }

        impl TryFrom<&str> for PDFVersion{
            type Error = PDFError;
            fn try_from(value: &str) -> Result<Self, Self::Error> {
                match value.as_ref() {
                    $(
                        $version => Ok(PDFVersion::$name),
                    )+
                    _ => Err(PDFError::InvalidPDFVersion(value.to_string())),
                }
            }
        }

        impl TryFrom<String> for PDFVersion{
            type Error = PDFError;
            fn try_from(value: String) -> Result<Self, Self::Error> {
                PDFVersion::try_from(value.as_str())
            }
        }

        impl std::str::FromStr for PDFVersion {
            type Err = PDFError;
            fn from_str(value: &str) -> Result<Self, Self::Err> {
                PDFVersion::try_from(value)
            }
        }

        impl Display for PDFVersion{
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.label())
            }
        }
    }
}

pdf_version!(
    (V1_0, "1.0"),
    (V1_1, "1.1"),
    (V1_2, "1.2"),
    (V1_3, "1.3"),
    (V1_4, "1.4"),
    (V1_5, "1.5"),
    (V1_6, "1.6"),
    (V1_7, "1.7"),
    (V2_0, "2.0")
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_every_known_version() {
        assert_eq!(PDFVersion::V1_0, PDFVersion::from_str("1.0").unwrap());
        assert_eq!(PDFVersion::V1_7, PDFVersion::from_str("1.7").unwrap());
        assert_eq!(PDFVersion::V2_0, PDFVersion::from_str("2.0").unwrap());
    }

    #[test]
    fn rejects_unknown_version() {
        assert!(PDFVersion::from_str("9.9").is_err());
    }

    #[test]
    fn label_round_trips_through_display() {
        assert_eq!(PDFVersion::V1_7.to_string(), "1.7");
    }
}
