//! Element-wise f64 kernels over `wide` SIMD lanes.
use wide::f64x4;

const LANES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    #[inline(always)]
    fn lanes(self, a: f64x4, b: f64x4) -> f64x4 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        }
    }

    #[inline(always)]
    fn scalar(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        }
    }
}

#[inline(always)]
fn load(chunk: &[f64]) -> f64x4 {
    f64x4::from([chunk[0], chunk[1], chunk[2], chunk[3]])
}

/// Applies `op` pairwise. Both slices must have the same length.
pub fn zip(op: BinaryOp, lhs: &[f64], rhs: &[f64]) -> Vec<f64> {
    debug_assert_eq!(lhs.len(), rhs.len());
    let mut out = Vec::with_capacity(lhs.len());

    let l_chunks = lhs.chunks_exact(LANES);
    let r_chunks = rhs.chunks_exact(LANES);
    let (l_tail, r_tail) = (l_chunks.remainder(), r_chunks.remainder());

    for (l, r) in l_chunks.zip(r_chunks) {
        out.extend_from_slice(&op.lanes(load(l), load(r)).to_array());
    }
    for (&l, &r) in l_tail.iter().zip(r_tail) {
        out.push(op.scalar(l, r));
    }
    out
}

/// Applies `op` between every element of `lhs` and the broadcast `rhs`.
pub fn zip_scalar(op: BinaryOp, lhs: &[f64], rhs: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(lhs.len());
    let splat = f64x4::splat(rhs);

    let chunks = lhs.chunks_exact(LANES);
    let tail = chunks.remainder();
    for l in chunks {
        out.extend_from_slice(&op.lanes(load(l), splat).to_array());
    }
    out.extend(tail.iter().map(|&l| op.scalar(l, rhs)));
    out
}

/// Same as `zip_scalar` with the scalar on the left-hand side.
pub fn scalar_zip(op: BinaryOp, lhs: f64, rhs: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(rhs.len());
    let splat = f64x4::splat(lhs);

    let chunks = rhs.chunks_exact(LANES);
    let tail = chunks.remainder();
    for r in chunks {
        out.extend_from_slice(&op.lanes(splat, load(r)).to_array());
    }
    out.extend(tail.iter().map(|&r| op.scalar(lhs, r)));
    out
}
