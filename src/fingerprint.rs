//! Fingerprint — the canonical string identifying a unique (source,
//! dimensions, transforms, format) tuple. Doubles as the result-cache key,
//! the in-flight key, and the `Content-Disposition` filename.

use std::fmt;

use crate::params::Params;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Params> for Fingerprint {
    fn from(p: &Params) -> Self {
        let mut s = format!(
            "{}-{}x{}{}",
            p.id,
            p.width,
            p.height,
            p.extension.as_ext_str()
        );
        if let Some(amount) = p.blur_amount {
            s.push_str(&format!("-blur_{amount}"));
        }
        if p.grayscale {
            s.push_str("-grayscale");
        }
        Fingerprint(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Extension;

    fn base() -> Params {
        Params {
            id: "123".into(),
            width: 100,
            height: 100,
            extension: Extension::Jpeg,
            blur_amount: None,
            grayscale: false,
        }
    }

    #[test]
    fn stable_for_identical_params() {
        let a = Fingerprint::from(&base());
        let b = Fingerprint::from(&base());
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "123-100x100.jpg");
    }

    #[test]
    fn differs_on_blur_amount() {
        let mut p1 = base();
        p1.blur_amount = Some(3);
        let mut p2 = base();
        p2.blur_amount = Some(5);
        assert_ne!(Fingerprint::from(&p1), Fingerprint::from(&p2));
    }

    #[test]
    fn differs_on_grayscale() {
        let mut p1 = base();
        p1.grayscale = true;
        assert_ne!(Fingerprint::from(&p1), Fingerprint::from(&base()));
    }

    #[test]
    fn differs_on_dimensions_and_extension() {
        let mut p = base();
        p.width = 200;
        assert_ne!(Fingerprint::from(&p), Fingerprint::from(&base()));

        let mut p2 = base();
        p2.extension = Extension::WebP;
        assert_ne!(Fingerprint::from(&p2), Fingerprint::from(&base()));
    }

    #[test]
    fn combines_blur_and_grayscale_in_fixed_order() {
        let mut p = base();
        p.blur_amount = Some(7);
        p.grayscale = true;
        assert_eq!(
            Fingerprint::from(&p).as_str(),
            "123-100x100.jpg-blur_7-grayscale"
        );
    }
}
