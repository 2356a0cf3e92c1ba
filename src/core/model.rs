use crate::core::geodata::Scp;
use crate::core::poly::{Poly1d, Poly2d, XyzPoly};
use crate::core::schema::{FieldKind, FieldSpec, IndexKind, Schema, CORNER_LABELS};
use crate::io::xml::XmlElement;
use crate::types::{MetaError, MetaResult, ValidationMode};
use serde_json::Value;

/// A value held by one schema field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Double(f64),
    Int(i64),
    /// Free-form or canonicalized enumerated text.
    Text(String),
    Poly1d(Poly1d),
    Poly2d(Poly2d),
    XyzPoly(XyzPoly),
    Scp(Scp),
    Object(Object),
    Array(Vec<Object>),
    Params(Vec<(String, String)>),
}

impl FieldValue {
    fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Double(_) => "float",
            FieldValue::Int(_) => "integer",
            FieldValue::Text(_) => "text",
            FieldValue::Poly1d(_) => "1-D polynomial",
            FieldValue::Poly2d(_) => "2-D polynomial",
            FieldValue::XyzPoly(_) => "XYZ polynomial",
            FieldValue::Scp(_) => "scene center point",
            FieldValue::Object(_) => "object",
            FieldValue::Array(_) => "object array",
            FieldValue::Params(_) => "parameter collection",
        }
    }
}

/// A generic object-model instance: a schema plus one value slot per
/// declared field, in schema order.
///
/// Field setters validate as they run; structural checks (required fields,
/// choice exclusivity, array minimum lengths) are deferred to
/// [`Object::validate`], which serialization invokes. The validation mode
/// is fixed at construction.
#[derive(Debug, Clone)]
pub struct Object {
    schema: &'static Schema,
    values: Vec<Option<FieldValue>>,
    mode: ValidationMode,
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema) && self.values == other.values
    }
}

impl Object {
    pub fn new(schema: &'static Schema) -> Self {
        Object::with_mode(schema, ValidationMode::Strict)
    }

    pub fn with_mode(schema: &'static Schema, mode: ValidationMode) -> Self {
        Object {
            schema,
            values: vec![None; schema.fields.len()],
            mode,
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    fn index_of(&self, name: &str) -> MetaResult<usize> {
        self.schema
            .field_index(name)
            .ok_or_else(|| MetaError::UnknownField(name.to_string()))
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        let i = self.schema.field_index(name)?;
        self.values[i].as_ref()
    }

    pub fn get_double(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(FieldValue::Double(v)) => Some(*v),
            Some(FieldValue::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(FieldValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_poly1(&self, name: &str) -> Option<&Poly1d> {
        match self.get(name) {
            Some(FieldValue::Poly1d(p)) => Some(p),
            _ => None,
        }
    }

    pub fn get_poly2(&self, name: &str) -> Option<&Poly2d> {
        match self.get(name) {
            Some(FieldValue::Poly2d(p)) => Some(p),
            _ => None,
        }
    }

    pub fn get_xyz_poly(&self, name: &str) -> Option<&XyzPoly> {
        match self.get(name) {
            Some(FieldValue::XyzPoly(p)) => Some(p),
            _ => None,
        }
    }

    pub fn get_scp(&self, name: &str) -> Option<&Scp> {
        match self.get(name) {
            Some(FieldValue::Scp(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_object(&self, name: &str) -> Option<&Object> {
        match self.get(name) {
            Some(FieldValue::Object(o)) => Some(o),
            _ => None,
        }
    }

    pub fn get_array(&self, name: &str) -> Option<&[Object]> {
        match self.get(name) {
            Some(FieldValue::Array(items)) => Some(items),
            _ => None,
        }
    }

    pub fn get_params(&self, name: &str) -> Option<&[(String, String)]> {
        match self.get(name) {
            Some(FieldValue::Params(pairs)) => Some(pairs),
            _ => None,
        }
    }

    /// Look up a parameter value by name within a parameter-map field.
    /// Absence is an empty result, not an error.
    pub fn param(&self, field: &str, name: &str) -> Option<&str> {
        self.get_params(field)?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Assign a field value, validating per the declared kind. In lenient
    /// mode a bad value is logged and the field nulled instead of failing.
    /// Array assignment re-stamps element indices in array order.
    pub fn set(&mut self, name: &str, value: FieldValue) -> MetaResult<()> {
        let i = self.index_of(name)?;
        let spec = &self.schema.fields[i];
        match coerce(spec, value) {
            Ok(v) => {
                self.values[i] = Some(v);
                Ok(())
            }
            Err(e) if self.mode.is_strict() => Err(e),
            Err(e) => {
                log::warn!("nulling field '{}': {}", name, e);
                self.values[i] = None;
                Ok(())
            }
        }
    }

    /// Parse and assign a scalar field from its text form.
    pub fn set_from_text(&mut self, name: &str, text: &str) -> MetaResult<()> {
        let i = self.index_of(name)?;
        let spec = &self.schema.fields[i];
        match scalar_from_text(spec, text) {
            Ok(v) => {
                self.values[i] = Some(v);
                Ok(())
            }
            Err(e) if self.mode.is_strict() => Err(e),
            Err(e) => {
                log::warn!("nulling field '{}': {}", name, e);
                self.values[i] = None;
                Ok(())
            }
        }
    }

    pub fn clear(&mut self, name: &str) -> MetaResult<()> {
        let i = self.index_of(name)?;
        self.values[i] = None;
        Ok(())
    }

    /// The first populated member of the given choice group, if any.
    pub fn active_choice(&self, group: usize) -> Option<&'static str> {
        self.schema
            .choices
            .get(group)?
            .members
            .iter()
            .find(|m| self.is_set(m))
            .copied()
    }

    /// Structural validation pass: required-field presence, array minimum
    /// lengths, and choice-group exclusivity, recursing into nested objects
    /// and array elements. Returns the first failure.
    pub fn validate(&self) -> MetaResult<()> {
        for (spec, value) in self.schema.fields.iter().zip(&self.values) {
            match value {
                None => {
                    if spec.required {
                        return Err(MetaError::MissingRequiredField(spec.name.to_string()));
                    }
                }
                Some(FieldValue::Object(o)) => o.validate()?,
                Some(FieldValue::Array(items)) => {
                    if let FieldKind::Array { min_len, .. } = &spec.kind {
                        if items.len() < *min_len {
                            return Err(MetaError::ArrayLengthViolation {
                                field: spec.name.to_string(),
                                actual: items.len(),
                                minimum: *min_len,
                            });
                        }
                    }
                    for item in items {
                        item.validate()?;
                    }
                }
                Some(_) => {}
            }
        }
        for choice in self.schema.choices {
            let populated: Vec<String> = choice
                .members
                .iter()
                .filter(|m| self.is_set(m))
                .map(|m| m.to_string())
                .collect();
            if populated.len() > 1 {
                return Err(MetaError::ChoiceViolation(populated));
            }
            if choice.required && populated.is_empty() {
                return Err(MetaError::MissingRequiredField(choice.members.join("|")));
            }
        }
        Ok(())
    }

    /// Serialize to an element tagged with the schema's type tag.
    pub fn to_node(&self) -> MetaResult<XmlElement> {
        self.to_node_tagged(self.schema.tag)
    }

    /// Serialize to an element with an explicit tag. Strict mode refuses
    /// to serialize an invalid graph; lenient mode logs and proceeds with
    /// whatever is populated.
    pub fn to_node_tagged(&self, tag: &str) -> MetaResult<XmlElement> {
        if let Err(e) = self.validate() {
            if self.mode.is_strict() {
                return Err(MetaError::Validation(Box::new(e)));
            }
            log::warn!("serializing invalid '{}' object: {}", tag, e);
        }
        self.node_unchecked(tag)
    }

    fn node_unchecked(&self, tag: &str) -> MetaResult<XmlElement> {
        let mut node = XmlElement::new(tag);
        for (spec, value) in self.schema.fields.iter().zip(&self.values) {
            let Some(value) = value else { continue };
            match value {
                FieldValue::Double(_) | FieldValue::Int(_) | FieldValue::Text(_) => {
                    let text = format_scalar(spec, value);
                    if spec.attribute {
                        node.set_attr(spec.name, text);
                    } else {
                        node.push_child(XmlElement::with_text(spec.name, text));
                    }
                }
                FieldValue::Poly1d(p) => node.push_child(p.to_node(spec.name)),
                FieldValue::Poly2d(p) => node.push_child(p.to_node(spec.name)),
                FieldValue::XyzPoly(p) => node.push_child(p.to_node(spec.name)),
                FieldValue::Scp(s) => node.push_child(s.to_node(spec.name)?),
                FieldValue::Object(o) => node.push_child(o.node_unchecked(spec.name)?),
                FieldValue::Array(items) => {
                    let FieldKind::Array { child_tag, .. } = &spec.kind else {
                        return Err(MetaError::type_mismatch(spec.name, "not an array field"));
                    };
                    let mut wrapper = XmlElement::new(spec.name);
                    wrapper.set_attr("size", items.len().to_string());
                    for item in items {
                        wrapper.push_child(item.node_unchecked(child_tag)?);
                    }
                    node.push_child(wrapper);
                }
                FieldValue::Params(pairs) => {
                    let FieldKind::Params { child_tag } = &spec.kind else {
                        return Err(MetaError::type_mismatch(spec.name, "not a parameter field"));
                    };
                    for (name, val) in pairs {
                        let mut child = XmlElement::with_text(*child_tag, val.clone());
                        child.set_attr("name", name.clone());
                        node.push_child(child);
                    }
                }
            }
        }
        Ok(node)
    }

    /// Parse an instance from an element. Declared fields with no match
    /// in the document remain null.
    pub fn from_node(
        schema: &'static Schema,
        node: &XmlElement,
        mode: ValidationMode,
    ) -> MetaResult<Object> {
        let mut obj = Object::with_mode(schema, mode);
        for (i, spec) in schema.fields.iter().enumerate() {
            match parse_field_node(spec, node, mode) {
                Ok(v) => obj.values[i] = v,
                Err(e) if mode.is_strict() => return Err(e),
                Err(e) => log::warn!("skipping field '{}': {}", spec.name, e),
            }
        }
        Ok(obj)
    }

    /// Serialize to the nested-mapping representation, mirroring the node
    /// walk one-to-one.
    pub fn to_map(&self) -> MetaResult<Value> {
        if let Err(e) = self.validate() {
            if self.mode.is_strict() {
                return Err(MetaError::Validation(Box::new(e)));
            }
            log::warn!("serializing invalid '{}' object: {}", self.schema.tag, e);
        }
        self.map_unchecked()
    }

    fn map_unchecked(&self) -> MetaResult<Value> {
        let mut map = serde_json::Map::new();
        for (spec, value) in self.schema.fields.iter().zip(&self.values) {
            let Some(value) = value else { continue };
            let entry = match value {
                FieldValue::Double(v) => Value::from(*v),
                FieldValue::Int(v) => Value::from(*v),
                FieldValue::Text(s) => Value::from(s.clone()),
                FieldValue::Poly1d(p) => p.to_map(),
                FieldValue::Poly2d(p) => p.to_map(),
                FieldValue::XyzPoly(p) => p.to_map(),
                FieldValue::Scp(s) => s.to_map(),
                FieldValue::Object(o) => o.map_unchecked()?,
                FieldValue::Array(items) => Value::Array(
                    items
                        .iter()
                        .map(|o| o.map_unchecked())
                        .collect::<MetaResult<Vec<_>>>()?,
                ),
                FieldValue::Params(pairs) => Value::Array(
                    pairs
                        .iter()
                        .map(|(n, v)| {
                            let mut pair = serde_json::Map::new();
                            pair.insert("name".to_string(), Value::from(n.clone()));
                            pair.insert("value".to_string(), Value::from(v.clone()));
                            Value::Object(pair)
                        })
                        .collect(),
                ),
            };
            map.insert(spec.name.to_string(), entry);
        }
        Ok(Value::Object(map))
    }

    /// Parse an instance from the nested-mapping representation.
    pub fn from_map(
        schema: &'static Schema,
        value: &Value,
        mode: ValidationMode,
    ) -> MetaResult<Object> {
        let map = value
            .as_object()
            .ok_or_else(|| MetaError::type_mismatch(schema.tag, "expected a mapping"))?;
        let mut obj = Object::with_mode(schema, mode);
        for (i, spec) in schema.fields.iter().enumerate() {
            let Some(entry) = map.get(spec.name) else {
                continue;
            };
            match parse_field_map(spec, entry, mode) {
                Ok(v) => obj.values[i] = v,
                Err(e) if mode.is_strict() => return Err(e),
                Err(e) => log::warn!("skipping field '{}': {}", spec.name, e),
            }
        }
        Ok(obj)
    }
}

/// Validate/coerce an assigned value against a field spec.
fn coerce(spec: &FieldSpec, value: FieldValue) -> MetaResult<FieldValue> {
    match (&spec.kind, value) {
        (
            FieldKind::Double { .. }
            | FieldKind::BoundedDouble { .. }
            | FieldKind::ModularDouble { .. },
            FieldValue::Double(v),
        ) => Ok(FieldValue::Double(spec.kind.check_double(spec.name, v)?)),
        (
            FieldKind::Double { .. }
            | FieldKind::BoundedDouble { .. }
            | FieldKind::ModularDouble { .. },
            FieldValue::Int(v),
        ) => Ok(FieldValue::Double(
            spec.kind.check_double(spec.name, v as f64)?,
        )),
        (FieldKind::Int { .. }, FieldValue::Int(v)) => {
            Ok(FieldValue::Int(spec.kind.check_int(spec.name, v)?))
        }
        (FieldKind::Text | FieldKind::EnumText { .. }, FieldValue::Text(s)) => {
            Ok(FieldValue::Text(spec.kind.check_text(spec.name, &s)?))
        }
        (FieldKind::Poly1d, v @ FieldValue::Poly1d(_)) => Ok(v),
        (FieldKind::Poly2d, v @ FieldValue::Poly2d(_)) => Ok(v),
        (FieldKind::XyzPoly, v @ FieldValue::XyzPoly(_)) => Ok(v),
        (FieldKind::Scp, v @ FieldValue::Scp(_)) => Ok(v),
        (FieldKind::Nested { schema }, FieldValue::Object(o)) => {
            if std::ptr::eq(o.schema, *schema) {
                Ok(FieldValue::Object(o))
            } else {
                Err(MetaError::type_mismatch(
                    spec.name,
                    format!("expected a '{}' object, got '{}'", schema.tag, o.schema.tag),
                ))
            }
        }
        (FieldKind::Array { elem, index, .. }, FieldValue::Array(mut items)) => {
            for item in &items {
                if !std::ptr::eq(item.schema, *elem) {
                    return Err(MetaError::type_mismatch(
                        spec.name,
                        format!(
                            "expected '{}' elements, got '{}'",
                            elem.tag, item.schema.tag
                        ),
                    ));
                }
            }
            stamp_indices(spec.name, &mut items, *index, true)?;
            Ok(FieldValue::Array(items))
        }
        // a single element promotes to a one-element array
        (FieldKind::Array { .. }, FieldValue::Object(o)) => {
            coerce(spec, FieldValue::Array(vec![o]))
        }
        (FieldKind::Params { .. }, FieldValue::Params(pairs)) => {
            Ok(FieldValue::Params(pairs))
        }
        (_, other) => Err(MetaError::type_mismatch(
            spec.name,
            format!("cannot assign a {} value", other.kind_name()),
        )),
    }
}

/// Assign positional indices to array elements per the declared index kind.
/// With `overwrite` false, elements that already carry an index keep it.
fn stamp_indices(
    field: &str,
    items: &mut [Object],
    kind: IndexKind,
    overwrite: bool,
) -> MetaResult<()> {
    if kind == IndexKind::CornerStrings && items.len() > CORNER_LABELS.len() {
        return Err(MetaError::type_mismatch(
            field,
            format!(
                "corner-point array has {} elements, labels exist for {}",
                items.len(),
                CORNER_LABELS.len()
            ),
        ));
    }
    for (i, item) in items.iter_mut().enumerate() {
        let Some(slot) = item.schema.field_index("index") else {
            continue;
        };
        if !overwrite && item.values[slot].is_some() {
            continue;
        }
        item.values[slot] = Some(match kind {
            IndexKind::ZeroBased => FieldValue::Int(i as i64),
            IndexKind::OneBased => FieldValue::Int(i as i64 + 1),
            IndexKind::CornerStrings => FieldValue::Text(CORNER_LABELS[i].to_string()),
        });
    }
    Ok(())
}

fn format_scalar(spec: &FieldSpec, value: &FieldValue) -> String {
    match value {
        FieldValue::Double(v) => match spec.kind.format() {
            Some(fmt) => fmt.format(*v),
            None => v.to_string(),
        },
        FieldValue::Int(v) => v.to_string(),
        FieldValue::Text(s) => s.clone(),
        _ => String::new(),
    }
}

fn scalar_from_text(spec: &FieldSpec, text: &str) -> MetaResult<FieldValue> {
    let t = text.trim();
    match &spec.kind {
        FieldKind::Double { .. }
        | FieldKind::BoundedDouble { .. }
        | FieldKind::ModularDouble { .. } => {
            let v = t.parse::<f64>().map_err(|_| {
                MetaError::type_mismatch(spec.name, format!("unparsable float '{}'", t))
            })?;
            Ok(FieldValue::Double(spec.kind.check_double(spec.name, v)?))
        }
        FieldKind::Int { .. } => {
            let v = t.parse::<i64>().map_err(|_| {
                MetaError::type_mismatch(spec.name, format!("unparsable integer '{}'", t))
            })?;
            Ok(FieldValue::Int(spec.kind.check_int(spec.name, v)?))
        }
        FieldKind::Text | FieldKind::EnumText { .. } => {
            Ok(FieldValue::Text(spec.kind.check_text(spec.name, t)?))
        }
        _ => Err(MetaError::type_mismatch(
            spec.name,
            "field does not hold scalar text",
        )),
    }
}

fn parse_field_node(
    spec: &FieldSpec,
    node: &XmlElement,
    mode: ValidationMode,
) -> MetaResult<Option<FieldValue>> {
    match &spec.kind {
        kind if kind.is_scalar() => {
            let text = if spec.attribute {
                node.attr(spec.name)
            } else {
                node.find(spec.name).and_then(|c| c.text.as_deref())
            };
            text.map(|t| scalar_from_text(spec, t)).transpose()
        }
        FieldKind::Poly1d => node
            .find(spec.name)
            .map(|c| Poly1d::from_node(c).map(FieldValue::Poly1d))
            .transpose(),
        FieldKind::Poly2d => node
            .find(spec.name)
            .map(|c| Poly2d::from_node(c).map(FieldValue::Poly2d))
            .transpose(),
        FieldKind::XyzPoly => node
            .find(spec.name)
            .map(|c| XyzPoly::from_node(c).map(FieldValue::XyzPoly))
            .transpose(),
        FieldKind::Scp => node
            .find(spec.name)
            .map(|c| Scp::from_node(c, mode).map(FieldValue::Scp))
            .transpose(),
        FieldKind::Nested { schema } => node
            .find(spec.name)
            .map(|c| Object::from_node(schema, c, mode).map(FieldValue::Object))
            .transpose(),
        FieldKind::Array {
            elem, child_tag, ..
        } => match node.find(spec.name) {
            None => Ok(None),
            Some(wrapper) => {
                let items = wrapper
                    .find_all(child_tag)
                    .map(|c| Object::from_node(elem, c, mode))
                    .collect::<MetaResult<Vec<_>>>()?;
                Ok(Some(FieldValue::Array(items)))
            }
        },
        FieldKind::Params { child_tag } => {
            let pairs: Vec<(String, String)> = node
                .find_all(child_tag)
                .map(|c| {
                    (
                        c.attr("name").unwrap_or("").to_string(),
                        c.text.clone().unwrap_or_default(),
                    )
                })
                .collect();
            Ok(if pairs.is_empty() {
                None
            } else {
                Some(FieldValue::Params(pairs))
            })
        }
        _ => Ok(None),
    }
}

fn parse_field_map(
    spec: &FieldSpec,
    entry: &Value,
    mode: ValidationMode,
) -> MetaResult<Option<FieldValue>> {
    if entry.is_null() {
        return Ok(None);
    }
    match &spec.kind {
        FieldKind::Double { .. }
        | FieldKind::BoundedDouble { .. }
        | FieldKind::ModularDouble { .. } => {
            let v = match entry {
                Value::Number(n) => n.as_f64().ok_or_else(|| {
                    MetaError::type_mismatch(spec.name, "non-finite numeric value")
                })?,
                Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
                    MetaError::type_mismatch(spec.name, format!("unparsable float '{}'", s))
                })?,
                _ => {
                    return Err(MetaError::type_mismatch(spec.name, "expected a number"));
                }
            };
            Ok(Some(FieldValue::Double(
                spec.kind.check_double(spec.name, v)?,
            )))
        }
        FieldKind::Int { .. } => {
            let v = match entry {
                Value::Number(n) => n
                    .as_i64()
                    .ok_or_else(|| MetaError::type_mismatch(spec.name, "expected an integer"))?,
                Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
                    MetaError::type_mismatch(spec.name, format!("unparsable integer '{}'", s))
                })?,
                _ => {
                    return Err(MetaError::type_mismatch(spec.name, "expected an integer"));
                }
            };
            Ok(Some(FieldValue::Int(spec.kind.check_int(spec.name, v)?)))
        }
        FieldKind::Text | FieldKind::EnumText { .. } => {
            let s = entry
                .as_str()
                .ok_or_else(|| MetaError::type_mismatch(spec.name, "expected a string"))?;
            Ok(Some(FieldValue::Text(spec.kind.check_text(spec.name, s)?)))
        }
        FieldKind::Poly1d => Poly1d::from_map(entry).map(|p| Some(FieldValue::Poly1d(p))),
        FieldKind::Poly2d => Poly2d::from_map(entry).map(|p| Some(FieldValue::Poly2d(p))),
        FieldKind::XyzPoly => XyzPoly::from_map(entry).map(|p| Some(FieldValue::XyzPoly(p))),
        FieldKind::Scp => Scp::from_map(entry, mode).map(|s| Some(FieldValue::Scp(s))),
        FieldKind::Nested { schema } => {
            Object::from_map(schema, entry, mode).map(|o| Some(FieldValue::Object(o)))
        }
        FieldKind::Array { elem, index, .. } => {
            let seq = entry
                .as_array()
                .ok_or_else(|| MetaError::type_mismatch(spec.name, "expected a sequence"))?;
            let mut items = seq
                .iter()
                .map(|v| Object::from_map(elem, v, mode))
                .collect::<MetaResult<Vec<_>>>()?;
            stamp_indices(spec.name, &mut items, *index, false)?;
            Ok(Some(FieldValue::Array(items)))
        }
        FieldKind::Params { .. } => {
            let seq = entry
                .as_array()
                .ok_or_else(|| MetaError::type_mismatch(spec.name, "expected a sequence"))?;
            let pairs = seq
                .iter()
                .map(|v| {
                    let name = v.get("name").and_then(|n| n.as_str()).unwrap_or_default();
                    let value = v.get("value").and_then(|n| n.as_str()).unwrap_or_default();
                    (name.to_string(), value.to_string())
                })
                .collect();
            Ok(Some(FieldValue::Params(pairs)))
        }
    }
}
