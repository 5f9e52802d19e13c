//! Immutable node props

use crate::style::LayoutStyle;
use std::collections::BTreeMap;
use tether_value::NativeValue;

/// An immutable bag of prop values with its parsed layout style
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Props {
    values: BTreeMap<String, NativeValue>,
    style: LayoutStyle,
}

impl Props {
    /// Create props from raw values
    pub fn new(values: BTreeMap<String, NativeValue>) -> Self {
        let style = LayoutStyle::from_props(&values);
        Self { values, style }
    }

    /// Get a raw value
    pub fn get(&self, key: &str) -> Option<&NativeValue> {
        self.values.get(key)
    }

    /// All raw values
    pub fn values(&self) -> &BTreeMap<String, NativeValue> {
        &self.values
    }

    /// Parsed layout style
    pub fn style(&self) -> &LayoutStyle {
        &self.style
    }

    /// New props with `diff` applied. A null value removes the key.
    pub fn apply_diff(&self, diff: &BTreeMap<String, NativeValue>) -> Props {
        let mut values = self.values.clone();
        for (key, value) in diff {
            if value.is_null() {
                values.remove(key);
            } else {
                values.insert(key.clone(), value.clone());
            }
        }
        Props::new(values)
    }

    /// New props with one value changed
    pub fn with(&self, key: impl Into<String>, value: impl Into<NativeValue>) -> Props {
        let mut diff = BTreeMap::new();
        diff.insert(key.into(), value.into());
        self.apply_diff(&diff)
    }
}

impl<K: Into<String>, V: Into<NativeValue>> FromIterator<(K, V)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Props::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Dimension;

    #[test]
    fn test_diff_reparses_style() {
        let props: Props = [("width", 10.0), ("opacity", 0.5)].into_iter().collect();
        assert_eq!(props.style().width, Dimension::Points(10.0));

        let next = props.with("width", "25%").with("opacity", ());
        assert_eq!(next.style().width, Dimension::Percent(25.0));
        assert!(next.get("opacity").is_none());
        assert_eq!(props.get("opacity"), Some(&NativeValue::Number(0.5)));
    }
}
