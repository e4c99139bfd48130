//! Capability-to-Control Mapper.
//!
//! Translates one capability descriptor into a typed control and, for
//! writable capabilities, the command rule that relays user writes back to
//! the gateway. Composite, list and other specialized capability types are
//! not supported and are skipped without error.

use super::{Bridge, WriteRule};
use crate::host::{ControlSpec, DeviceStore};
use log::debug;

impl<S: DeviceStore> Bridge<S> {
    /// Map a capability descriptor, then recursively its declared features.
    pub(crate) fn map_capability(
        &mut self,
        zb_name: &str,
        dev_name: &str,
        expose: &crate::protocol::Expose,
    ) {
        self.map_single(zb_name, dev_name, expose);

        if let Some(features) = &expose.features {
            for feature in features {
                self.map_capability(zb_name, dev_name, feature);
            }
        }
    }

    fn map_single(&mut self, zb_name: &str, dev_name: &str, expose: &crate::protocol::Expose) {
        // Composite wrappers carry no property of their own
        let Some(property) = expose.property.as_deref() else {
            return;
        };

        match expose.kind.as_str() {
            "binary" => self.map_binary(zb_name, dev_name, property, expose),
            "numeric" if expose.value_min.is_some() && expose.value_max.is_some() => {
                self.map_range(zb_name, dev_name, property, expose);
            }
            "numeric" => self.map_numeric(dev_name, property, expose),
            "enum" => self.map_enum(zb_name, dev_name, property, expose),
            other => {
                debug!(
                    "Skipping unsupported capability type [{}] for {}/{}",
                    other, dev_name, property
                );
            }
        }
    }

    /// Binary capability: boolean control. Writes publish the gateway's
    /// domain labels (e.g. "LOCK"/"UNLOCK"), never literal booleans.
    fn map_binary(
        &mut self,
        zb_name: &str,
        dev_name: &str,
        property: &str,
        expose: &crate::protocol::Expose,
    ) {
        let readonly = expose.access.is_readonly();
        let (value_on, value_off) = expose.binary_labels();

        let spec = ControlSpec::switch(property, readonly)
            .with_description(format!("{},{}", value_off, value_on));
        let rule = (!readonly).then(|| WriteRule::SetBinary {
            set_topic: self.set_topic(zb_name),
            property: property.to_string(),
            value_on,
            value_off,
        });
        self.replace_control(dev_name, spec, rule);
    }

    /// Bounded numeric capability: range control publishing raw numbers.
    fn map_range(
        &mut self,
        zb_name: &str,
        dev_name: &str,
        property: &str,
        expose: &crate::protocol::Expose,
    ) {
        let readonly = expose.access.is_readonly();
        let min = expose.value_min.unwrap_or(0.0);
        let max = expose.value_max.unwrap_or(0.0);

        let spec = ControlSpec::range(property, readonly, min, max);
        let rule = (!readonly).then(|| WriteRule::SetNumber {
            set_topic: self.set_topic(zb_name),
            property: property.to_string(),
        });
        self.replace_control(dev_name, spec, rule);
    }

    /// Unbounded numeric capability: plain value control. Without declared
    /// bounds there is no safe raw value to send, so no write path exists.
    fn map_numeric(&mut self, dev_name: &str, property: &str, expose: &crate::protocol::Expose) {
        let mut spec = ControlSpec::value(property, 0.0);
        if let Some(unit) = expose.unit.as_deref() {
            spec = spec.with_unit(unit);
        }
        self.replace_control(dev_name, spec, None);
    }

    /// Enum capability: text control carrying the allowed values as
    /// metadata. Writable enums additionally get a trigger control that
    /// advances to the next allowed value, wrapping after the last.
    fn map_enum(
        &mut self,
        zb_name: &str,
        dev_name: &str,
        property: &str,
        expose: &crate::protocol::Expose,
    ) {
        let readonly = expose.access.is_readonly();
        let values = expose.values.clone().unwrap_or_default();

        let spec =
            ControlSpec::text(property, readonly, "").with_description(values.join(","));
        let rule = (!readonly).then(|| WriteRule::SetText {
            set_topic: self.set_topic(zb_name),
            property: property.to_string(),
        });
        self.replace_control(dev_name, spec, rule);

        if !readonly && !values.is_empty() {
            let toggle = format!("toggle_{}", property);
            let rule = WriteRule::AdvanceEnum {
                set_topic: self.set_topic(zb_name),
                property: property.to_string(),
                value_control: property.to_string(),
                values,
            };
            self.replace_control(dev_name, ControlSpec::pushbutton(toggle), Some(rule));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{bridge, drain};
    use super::*;
    use crate::host::{ControlType, Value};
    use crate::protocol::Expose;

    fn expose(json: &str) -> Expose {
        serde_json::from_str(json).unwrap()
    }

    fn mapped(json: &str) -> (crate::bridge::Bridge<crate::host::MemoryStore>, Vec<String>) {
        let (mut bridge, mut rx) = bridge();
        bridge.store().define_device("dev", "dev");
        bridge.map_capability("dev", "dev", &expose(json));
        drain(&mut rx);
        let names = bridge.store().control_names("dev");
        (bridge, names)
    }

    #[test]
    fn test_binary_readonly_tracks_settable_bit() {
        // access 1: published only, not settable
        let (bridge, _) = mapped(r#"{"type":"binary","property":"contact","access":1}"#);
        assert!(bridge.store().control("dev", "contact").unwrap().readonly);

        // access 3: published and settable
        let (bridge, _) = mapped(r#"{"type":"binary","property":"state","access":3}"#);
        assert!(!bridge.store().control("dev", "state").unwrap().readonly);
    }

    #[test]
    fn test_binary_carries_label_pair_off_first() {
        let (bridge, _) = mapped(
            r#"{"type":"binary","property":"state","access":3,
                "value_on":"ON","value_off":"OFF"}"#,
        );
        let ctrl = bridge.store().control("dev", "state").unwrap();
        assert_eq!(ctrl.kind, ControlType::Switch);
        assert_eq!(ctrl.description.as_deref(), Some("OFF,ON"));
    }

    #[test]
    fn test_bounded_numeric_becomes_range() {
        let (bridge, _) = mapped(
            r#"{"type":"numeric","property":"brightness","access":7,
                "value_min":0,"value_max":254}"#,
        );
        let ctrl = bridge.store().control("dev", "brightness").unwrap();
        assert_eq!(ctrl.kind, ControlType::Range);
        assert_eq!(ctrl.min, Some(0.0));
        assert_eq!(ctrl.max, Some(254.0));
        assert!(!ctrl.readonly);
    }

    #[test]
    fn test_unbounded_numeric_is_readonly_value_with_unit() {
        let (bridge, _) = mapped(r#"{"type":"numeric","property":"power","access":5,"unit":"W"}"#);
        let ctrl = bridge.store().control("dev", "power").unwrap();
        assert_eq!(ctrl.kind, ControlType::Value);
        assert_eq!(ctrl.value, Value::Number(0.0));
        assert_eq!(ctrl.unit.as_deref(), Some("W"));
        assert!(ctrl.readonly);
    }

    #[test]
    fn test_writable_enum_gets_advance_trigger() {
        let (bridge, names) = mapped(
            r#"{"type":"enum","property":"effect","access":3,
                "values":["blink","breathe","okay"]}"#,
        );
        assert_eq!(names, vec!["effect", "toggle_effect"]);
        let ctrl = bridge.store().control("dev", "effect").unwrap();
        assert_eq!(ctrl.kind, ControlType::Text);
        assert_eq!(ctrl.description.as_deref(), Some("blink,breathe,okay"));
        assert_eq!(
            bridge.store().control("dev", "toggle_effect").unwrap().kind,
            ControlType::Pushbutton
        );
    }

    #[test]
    fn test_readonly_enum_gets_no_trigger() {
        let (_, names) = mapped(
            r#"{"type":"enum","property":"action","access":1,
                "values":["single","double","hold"]}"#,
        );
        assert_eq!(names, vec!["action"]);
    }

    #[test]
    fn test_unsupported_types_are_skipped() {
        let (_, names) = mapped(r#"{"type":"composite","property":"color"}"#);
        assert!(names.is_empty());

        let (_, names) = mapped(r#"{"type":"list","property":"schedule"}"#);
        assert!(names.is_empty());
    }

    #[test]
    fn test_features_are_mapped_recursively() {
        let (bridge, names) = mapped(
            r#"{"type":"light","property":"light","features":[
                {"type":"binary","property":"state","access":7,
                 "value_on":"ON","value_off":"OFF"},
                {"type":"composite","property":"color","features":[
                    {"type":"numeric","property":"hue","access":7,
                     "value_min":0,"value_max":360}
                ]}
            ]}"#,
        );
        assert_eq!(names, vec!["state", "hue"]);
        assert_eq!(
            bridge.store().control("dev", "hue").unwrap().kind,
            ControlType::Range
        );
    }

    #[test]
    fn test_remapping_replaces_prior_control() {
        let (mut bridge, mut rx) = bridge();
        bridge.store().define_device("dev", "dev");

        bridge.map_capability(
            "dev",
            "dev",
            &expose(
                r#"{"type":"binary","property":"state","access":3,
                    "value_on":"ON","value_off":"OFF"}"#,
            ),
        );
        bridge.map_capability(
            "dev",
            "dev",
            &expose(
                r#"{"type":"binary","property":"state","access":1,
                    "value_on":"LOCK","value_off":"UNLOCK"}"#,
            ),
        );
        drain(&mut rx);

        // Exactly one control, reflecting only the newest descriptor
        assert_eq!(bridge.store().control_names("dev"), vec!["state"]);
        let ctrl = bridge.store().control("dev", "state").unwrap();
        assert_eq!(ctrl.description.as_deref(), Some("UNLOCK,LOCK"));
        assert!(ctrl.readonly);

        // The old write rule went with the old control
        bridge.handle_event(crate::bridge::BridgeEvent::ControlChanged(
            crate::host::ControlChange {
                device: "dev".to_string(),
                control: "state".to_string(),
                value: Value::Bool(true),
            },
        ));
        assert!(drain(&mut rx).is_empty());
    }
}
