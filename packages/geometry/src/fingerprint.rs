//! Content-based identity for drawn layers.
//!
//! Layers re-parsed from JSON are never the same object twice, so "is this
//! layer already stored?" has to compare content. The fingerprint is an MD5
//! digest over the layer kind and its exact coordinate bits. A ring is
//! hashed exactly as drawn, closing duplicate included, so two rings share
//! a fingerprint only if the classifier sees the same vertex count.

use spotted_geometry_models::{DrawnLayer, Vertex};

/// Returns a hex digest identifying the layer's kind and coordinates.
#[must_use]
pub fn fingerprint(layer: &DrawnLayer) -> String {
    let mut context = md5::Context::new();

    match layer {
        DrawnLayer::Ring { vertices } => {
            context.consume(b"ring");
            for v in vertices {
                consume_vertex(&mut context, v);
            }
        }
        DrawnLayer::Circle { center, radius_m } => {
            context.consume(b"circle");
            consume_vertex(&mut context, center);
            context.consume(radius_m.to_bits().to_le_bytes());
        }
    }

    format!("{:x}", context.finalize())
}

fn consume_vertex(context: &mut md5::Context, v: &Vertex) {
    context.consume(v.latitude.to_bits().to_le_bytes());
    context.consume(v.longitude.to_bits().to_le_bytes());
}
