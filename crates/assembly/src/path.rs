//! Assembly-instance addressing keys.
//!
//! One concrete position of a sub-product inside one order's expanded tree is
//! addressed by a hyphen-joined key:
//!
//! ```text
//! orderId-kitId-kitInstance[-modeloId-modeloInstance][-pecaId-pecaInstance]
//! ```
//!
//! The shape is variable-depth: the root segment may be a kit, a model, or a
//! piece. Decoding is position-based from the trailing `(id, instance)` pairs
//! back toward the root, so order ids may themselves contain hyphens; segment
//! ids may not (and may not be purely numeric), which `AssemblyPath::new`
//! enforces on the encode side.

use serde::{Deserialize, Serialize};

use printops_core::{DomainError, DomainResult, OrderId, ProductId};

/// Maximum nesting below the order: kit → model → piece.
pub const MAX_DEPTH: usize = 3;

/// One `(product id, instance number)` step of an assembly path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub id: ProductId,
    pub instance: u32,
}

impl PathSegment {
    pub fn new(id: ProductId, instance: u32) -> DomainResult<Self> {
        if instance == 0 {
            return Err(DomainError::validation("instance numbers start at 1"));
        }
        let raw = id.as_str();
        if raw.contains('-') {
            return Err(DomainError::invalid_id(format!(
                "segment id '{raw}' contains '-'"
            )));
        }
        if raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::invalid_id(format!(
                "segment id '{raw}' is purely numeric"
            )));
        }
        Ok(Self { id, instance })
    }
}

/// True when an order id cannot be confused with trailing `(id, instance)`
/// pairs of its own key. Three-plus hyphen tokens ending in a number would
/// make the position-based decoder eat part of the order id, so such ids are
/// rejected at construction.
fn order_id_is_path_safe(order: &str) -> bool {
    let tokens: Vec<&str> = order.split('-').collect();
    match tokens.last() {
        Some(last) if tokens.len() >= MAX_DEPTH => {
            !(!last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()))
        }
        _ => true,
    }
}

/// A decoded assembly-instance address: order id plus 1–3 path segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssemblyPath {
    order_id: OrderId,
    segments: Vec<PathSegment>,
}

impl AssemblyPath {
    pub fn new(order_id: OrderId, segments: Vec<PathSegment>) -> DomainResult<Self> {
        if segments.is_empty() || segments.len() > MAX_DEPTH {
            return Err(DomainError::validation(format!(
                "assembly paths carry 1 to {MAX_DEPTH} segments, got {}",
                segments.len()
            )));
        }
        if !order_id_is_path_safe(order_id.as_str()) {
            return Err(DomainError::invalid_id(format!(
                "order id '{}' ends in a numeric token and would decode ambiguously",
                order_id.as_str()
            )));
        }
        Ok(Self { order_id, segments })
    }

    /// Root-level path (`orderId-rootId-instance`).
    pub fn root(order_id: OrderId, id: ProductId, instance: u32) -> DomainResult<Self> {
        Self::new(order_id, vec![PathSegment::new(id, instance)?])
    }

    /// Extend the path one level down.
    pub fn child(&self, id: ProductId, instance: u32) -> DomainResult<Self> {
        if self.segments.len() == MAX_DEPTH {
            return Err(DomainError::validation("assembly path is already at piece depth"));
        }
        let mut segments = self.segments.clone();
        segments.push(PathSegment::new(id, instance)?);
        Ok(Self {
            order_id: self.order_id.clone(),
            segments,
        })
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The deepest segment (the addressed position itself).
    pub fn leaf(&self) -> &PathSegment {
        self.segments.last().expect("paths carry at least one segment")
    }

    /// The trailing instance number.
    pub fn instance_number(&self) -> u32 {
        self.leaf().instance
    }

    /// The root-level prefix of this path (`orderId-rootId-instance`).
    pub fn root_prefix(&self) -> AssemblyPath {
        AssemblyPath {
            order_id: self.order_id.clone(),
            segments: vec![self.segments[0].clone()],
        }
    }

    /// Encode to the wire key.
    pub fn encode(&self) -> AssemblyInstanceId {
        let mut key = self.order_id.as_str().to_string();
        for seg in &self.segments {
            key.push('-');
            key.push_str(seg.id.as_str());
            key.push('-');
            key.push_str(&seg.instance.to_string());
        }
        AssemblyInstanceId(key)
    }

    /// Decode a wire key.
    ///
    /// Pairs are consumed from the back while the trailing token parses as a
    /// positive integer, up to [`MAX_DEPTH`] pairs; whatever remains in front
    /// is the order id. An ill-formed key fails with
    /// [`DomainError::MalformedKey`] rather than guessing.
    pub fn decode(key: &str) -> DomainResult<Self> {
        let tokens: Vec<&str> = key.split('-').collect();

        let mut remaining = tokens.len();
        let mut pairs: Vec<PathSegment> = Vec::new();

        // `remaining > 2` keeps at least one token in front for the order id.
        while pairs.len() < MAX_DEPTH && remaining > 2 {
            let instance_tok = tokens[remaining - 1];
            let Ok(instance) = instance_tok.parse::<u32>() else {
                break;
            };
            if instance == 0 {
                return Err(DomainError::malformed_key(format!(
                    "'{key}': instance number 0"
                )));
            }
            let id_tok = tokens[remaining - 2];
            let id = ProductId::new(id_tok)
                .map_err(|_| DomainError::malformed_key(format!("'{key}': empty segment id")))?;
            pairs.push(PathSegment::new(id, instance).map_err(|_| {
                DomainError::malformed_key(format!("'{key}': invalid segment id '{id_tok}'"))
            })?);
            remaining -= 2;
        }

        if pairs.is_empty() {
            return Err(DomainError::malformed_key(format!(
                "'{key}': no trailing (id, instance) pair"
            )));
        }

        pairs.reverse();
        let order_raw = tokens[..remaining].join("-");
        let order_id = OrderId::new(order_raw)
            .map_err(|_| DomainError::malformed_key(format!("'{key}': empty order id")))?;

        Ok(Self {
            order_id,
            segments: pairs,
        })
    }
}

impl core::fmt::Display for AssemblyPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.encode(), f)
    }
}

/// The raw wire form of an assembly-instance address.
///
/// Group documents use this as their document id; consumption entries carry it
/// to pinpoint the position they fulfilled. Parse with
/// [`AssemblyInstanceId::parse`] when the structure is needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AssemblyInstanceId(String);

impl AssemblyInstanceId {
    /// Wrap a raw key without validating it (store documents may carry legacy
    /// malformed keys; those surface later as `MalformedKey` when parsed).
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn parse(&self) -> DomainResult<AssemblyPath> {
        AssemblyPath::decode(&self.0)
    }
}

impl core::fmt::Display for AssemblyInstanceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
