use crate::io::xml::XmlElement;
use crate::types::{MetaError, MetaResult};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::schema::format_sig;

/// Significant digits used for polynomial coefficient text.
const COEF_SIG_DIGITS: u32 = 10;

/// Binomial coefficient C(n, k) as a float, computed multiplicatively.
fn comb(n: usize, k: usize) -> f64 {
    let k = k.min(n - k);
    let mut out = 1.0;
    for i in 0..k {
        out = out * (n - i) as f64 / (i + 1) as f64;
    }
    out
}

/// A one-variable polynomial stored as a dense coefficient vector indexed
/// by increasing exponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poly1d {
    coefs: Array1<f64>,
}

impl Poly1d {
    pub fn new(coefs: Array1<f64>) -> Self {
        Poly1d { coefs }
    }

    pub fn from_coefs(coefs: impl Into<Vec<f64>>) -> Self {
        Poly1d {
            coefs: Array1::from(coefs.into()),
        }
    }

    /// Constant polynomial.
    pub fn constant(value: f64) -> Self {
        Poly1d::from_coefs(vec![value])
    }

    pub fn coefs(&self) -> &Array1<f64> {
        &self.coefs
    }

    /// Largest exponent present in the monomial terms.
    pub fn order(&self) -> usize {
        self.coefs.len().saturating_sub(1)
    }

    /// Evaluate at a single point (Horner's rule). An empty coefficient
    /// vector evaluates to zero.
    pub fn eval(&self, x: f64) -> f64 {
        self.coefs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }

    /// Evaluate elementwise over a set of points.
    pub fn eval_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }

    /// The `order`-th derivative. The result is empty when `order` is at
    /// least the number of coefficients.
    pub fn derivative(&self, order: usize) -> Poly1d {
        let mut coefs: Vec<f64> = self.coefs.to_vec();
        for _ in 0..order {
            if coefs.is_empty() {
                break;
            }
            coefs = coefs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(i, &c)| i as f64 * c)
                .collect();
        }
        Poly1d::from_coefs(coefs)
    }

    /// Evaluate the `order`-th derivative at `x`.
    pub fn derivative_eval(&self, x: f64, order: usize) -> f64 {
        self.derivative(order).eval(x)
    }

    /// Transform the polynomial under an affine shift of the coordinate
    /// system: the returned polynomial Q satisfies P(t) = Q(alpha * (t - t0)).
    ///
    /// `t0` is the current center coordinate in the new coordinate system
    /// (the re-centering is applied before the scaling). For `t0 = 0` the
    /// coefficients are simply scaled elementwise by `alpha^i`; otherwise
    /// each output coefficient gathers terms of the binomial expansion.
    pub fn shift(&self, t0: f64, alpha: f64) -> Poly1d {
        let n = self.coefs.len();
        let mut out: Vec<f64> = if t0 == 0.0 {
            self.coefs.to_vec()
        } else {
            let mut out = vec![0.0; n];
            for (i, slot) in out.iter_mut().enumerate() {
                let mut acc = 0.0;
                for j in i..n {
                    acc += comb(j, j - i) * self.coefs[j] * (-t0).powi((j - i) as i32);
                }
                *slot = acc;
            }
            out
        };

        if alpha != 1.0 {
            for (i, c) in out.iter_mut().enumerate() {
                *c *= alpha.powi(i as i32);
            }
        }
        Poly1d::from_coefs(out)
    }

    /// Scale every coefficient by a constant factor.
    pub fn scaled(&self, factor: f64) -> Poly1d {
        Poly1d::new(&self.coefs * factor)
    }

    /// Serialize as an element carrying an `order1` attribute and `Coef`
    /// children tagged with their `exponent1`.
    pub fn to_node(&self, tag: &str) -> XmlElement {
        let mut node = XmlElement::new(tag);
        node.set_attr("order1", self.order().to_string());
        for (i, &c) in self.coefs.iter().enumerate() {
            let mut coef = XmlElement::with_text("Coef", format_sig(c, COEF_SIG_DIGITS));
            coef.set_attr("exponent1", i.to_string());
            node.push_child(coef);
        }
        node
    }

    pub fn from_node(node: &XmlElement) -> MetaResult<Poly1d> {
        let order1 = parse_order_attr(node, "order1")?;
        let mut coefs = vec![0.0; order1 + 1];
        for cnode in node.find_all("Coef") {
            let exponent = parse_exponent_attr(cnode, "exponent1", order1)?;
            coefs[exponent] = parse_coef_text(cnode)?;
        }
        Ok(Poly1d::from_coefs(coefs))
    }

    pub fn to_map(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(
            "Coefs".to_string(),
            serde_json::Value::from(self.coefs.to_vec()),
        );
        serde_json::Value::Object(map)
    }

    pub fn from_map(value: &serde_json::Value) -> MetaResult<Poly1d> {
        let coefs = value
            .get("Coefs")
            .and_then(|v| v.as_array())
            .ok_or_else(|| MetaError::type_mismatch("Coefs", "expected a coefficient array"))?;
        let coefs: Vec<f64> = coefs
            .iter()
            .map(|v| {
                v.as_f64()
                    .ok_or_else(|| MetaError::type_mismatch("Coefs", "non-numeric coefficient"))
            })
            .collect::<MetaResult<_>>()?;
        Ok(Poly1d::from_coefs(coefs))
    }
}

/// A two-variable polynomial stored as a coefficient matrix indexed by
/// (exponent of variable 1, exponent of variable 2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poly2d {
    coefs: Array2<f64>,
}

impl Poly2d {
    pub fn new(coefs: Array2<f64>) -> Self {
        Poly2d { coefs }
    }

    /// Build from nested rows; ragged input is rejected.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> MetaResult<Poly2d> {
        let nrows = rows.len();
        let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != ncols) {
            return Err(MetaError::type_mismatch(
                "Coefs",
                "ragged coefficient rows are not a rectangular matrix",
            ));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let coefs = Array2::from_shape_vec((nrows, ncols), flat)
            .map_err(|e| MetaError::type_mismatch("Coefs", e.to_string()))?;
        Ok(Poly2d { coefs })
    }

    /// Constant polynomial.
    pub fn constant(value: f64) -> Self {
        Poly2d {
            coefs: Array2::from_elem((1, 1), value),
        }
    }

    pub fn coefs(&self) -> &Array2<f64> {
        &self.coefs
    }

    /// Largest exponent of the first variable.
    pub fn order1(&self) -> usize {
        self.coefs.nrows().saturating_sub(1)
    }

    /// Largest exponent of the second variable.
    pub fn order2(&self) -> usize {
        self.coefs.ncols().saturating_sub(1)
    }

    /// Evaluate the two-dimensional power sum at `(x, y)` by nested
    /// Horner's rule.
    pub fn eval(&self, x: f64, y: f64) -> f64 {
        let mut acc = 0.0;
        for row in self.coefs.outer_iter().rev() {
            let row_acc = row.iter().rev().fold(0.0, |a, &c| a * y + c);
            acc = acc * x + row_acc;
        }
        acc
    }

    /// Scale every coefficient by a constant factor.
    pub fn scaled(&self, factor: f64) -> Poly2d {
        Poly2d::new(&self.coefs * factor)
    }

    /// Serialize with `order1`/`order2` attributes and `Coef` children
    /// tagged with `exponent1`/`exponent2`.
    pub fn to_node(&self, tag: &str) -> XmlElement {
        let mut node = XmlElement::new(tag);
        node.set_attr("order1", self.order1().to_string());
        node.set_attr("order2", self.order2().to_string());
        for (i, row) in self.coefs.outer_iter().enumerate() {
            for (j, &c) in row.iter().enumerate() {
                let mut coef = XmlElement::with_text("Coef", format_sig(c, COEF_SIG_DIGITS));
                coef.set_attr("exponent1", i.to_string());
                coef.set_attr("exponent2", j.to_string());
                node.push_child(coef);
            }
        }
        node
    }

    pub fn from_node(node: &XmlElement) -> MetaResult<Poly2d> {
        let order1 = parse_order_attr(node, "order1")?;
        let order2 = parse_order_attr(node, "order2")?;
        let mut coefs = Array2::zeros((order1 + 1, order2 + 1));
        for cnode in node.find_all("Coef") {
            let i = parse_exponent_attr(cnode, "exponent1", order1)?;
            let j = parse_exponent_attr(cnode, "exponent2", order2)?;
            coefs[[i, j]] = parse_coef_text(cnode)?;
        }
        Ok(Poly2d::new(coefs))
    }

    pub fn to_map(&self) -> serde_json::Value {
        let rows: Vec<Vec<f64>> = self
            .coefs
            .outer_iter()
            .map(|row| row.to_vec())
            .collect();
        let mut map = serde_json::Map::new();
        map.insert("Coefs".to_string(), serde_json::Value::from(rows));
        serde_json::Value::Object(map)
    }

    pub fn from_map(value: &serde_json::Value) -> MetaResult<Poly2d> {
        let rows = value
            .get("Coefs")
            .and_then(|v| v.as_array())
            .ok_or_else(|| MetaError::type_mismatch("Coefs", "expected coefficient rows"))?;
        let rows: Vec<Vec<f64>> = rows
            .iter()
            .map(|row| {
                row.as_array()
                    .ok_or_else(|| MetaError::type_mismatch("Coefs", "expected a coefficient row"))?
                    .iter()
                    .map(|v| {
                        v.as_f64().ok_or_else(|| {
                            MetaError::type_mismatch("Coefs", "non-numeric coefficient")
                        })
                    })
                    .collect()
            })
            .collect::<MetaResult<_>>()?;
        Poly2d::from_rows(rows)
    }
}

/// One single-variable polynomial per spatial axis, giving an ECF position
/// (or similar 3-vector) as a function of one dependent variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XyzPoly {
    pub x: Poly1d,
    pub y: Poly1d,
    pub z: Poly1d,
}

impl XyzPoly {
    pub fn new(x: Poly1d, y: Poly1d, z: Poly1d) -> Self {
        XyzPoly { x, y, z }
    }

    /// Evaluate all three components at `t`.
    pub fn eval(&self, t: f64) -> [f64; 3] {
        [self.x.eval(t), self.y.eval(t), self.z.eval(t)]
    }

    /// Componentwise derivative.
    pub fn derivative(&self, order: usize) -> XyzPoly {
        XyzPoly {
            x: self.x.derivative(order),
            y: self.y.derivative(order),
            z: self.z.derivative(order),
        }
    }

    /// Evaluate the componentwise derivative at `t`.
    pub fn derivative_eval(&self, t: f64, order: usize) -> [f64; 3] {
        self.derivative(order).eval(t)
    }

    /// Componentwise affine resampling; see [`Poly1d::shift`].
    pub fn shift(&self, t0: f64, alpha: f64) -> XyzPoly {
        XyzPoly {
            x: self.x.shift(t0, alpha),
            y: self.y.shift(t0, alpha),
            z: self.z.shift(t0, alpha),
        }
    }

    pub fn to_node(&self, tag: &str) -> XmlElement {
        let mut node = XmlElement::new(tag);
        node.push_child(self.x.to_node("X"));
        node.push_child(self.y.to_node("Y"));
        node.push_child(self.z.to_node("Z"));
        node
    }

    pub fn from_node(node: &XmlElement) -> MetaResult<XyzPoly> {
        let component = |tag: &str| -> MetaResult<Poly1d> {
            let child = node
                .find(tag)
                .ok_or_else(|| MetaError::MissingRequiredField(format!("{}.{}", node.tag, tag)))?;
            Poly1d::from_node(child)
        };
        Ok(XyzPoly {
            x: component("X")?,
            y: component("Y")?,
            z: component("Z")?,
        })
    }

    pub fn to_map(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("X".to_string(), self.x.to_map());
        map.insert("Y".to_string(), self.y.to_map());
        map.insert("Z".to_string(), self.z.to_map());
        serde_json::Value::Object(map)
    }

    pub fn from_map(value: &serde_json::Value) -> MetaResult<XyzPoly> {
        let component = |key: &str| -> MetaResult<Poly1d> {
            let child = value
                .get(key)
                .ok_or_else(|| MetaError::MissingRequiredField(key.to_string()))?;
            Poly1d::from_map(child)
        };
        Ok(XyzPoly {
            x: component("X")?,
            y: component("Y")?,
            z: component("Z")?,
        })
    }
}

fn parse_order_attr(node: &XmlElement, name: &str) -> MetaResult<usize> {
    let text = node.attr(name).ok_or_else(|| {
        MetaError::type_mismatch(&node.tag, format!("missing '{}' attribute", name))
    })?;
    text.trim()
        .parse::<usize>()
        .map_err(|_| MetaError::type_mismatch(&node.tag, format!("unparsable '{}' attribute", name)))
}

fn parse_exponent_attr(node: &XmlElement, name: &str, order: usize) -> MetaResult<usize> {
    let exponent = parse_order_attr(node, name)?;
    if exponent > order {
        return Err(MetaError::type_mismatch(
            &node.tag,
            format!("'{}' value {} exceeds declared order {}", name, exponent, order),
        ));
    }
    Ok(exponent)
}

fn parse_coef_text(node: &XmlElement) -> MetaResult<f64> {
    let text = node
        .text
        .as_deref()
        .ok_or_else(|| MetaError::type_mismatch("Coef", "empty coefficient element"))?;
    text.trim()
        .parse::<f64>()
        .map_err(|_| MetaError::type_mismatch("Coef", format!("unparsable value '{}'", text)))
}
