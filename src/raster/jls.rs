// JPEG-LS Decoder
// Adaptive context lossless / near-lossless decoding of raster sub-tiles

use super::bitstream::BitStream;
use super::matrix::SampleMatrix;
use super::{Predictor, RasterError};

/// Run length order per run index
const J: [u32; 32] = [
    0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 9, 10, 11, 12, 13,
    14, 15,
];

/// Sample count at which a context's accumulators are halved
const RESET: i32 = 64;

/// Per-image decoder state
struct Context {
    width: usize,
    a: [i32; 4],
    b: [i32; 4],
    n: [i32; 4],
    run_index: usize,
    rk: u32,
    rg: u32,
    /// Order of the last terminated run plus one
    lrk: u32,
    last: Vec<i32>,
    current: Vec<i32>,
}

impl Context {
    fn new(width: usize, range: i32) -> Self {
        let a = ((range + 32) / 64).max(2);
        Self {
            width,
            a: [a; 4],
            b: [0; 4],
            n: [1; 4],
            run_index: 0,
            rk: J[0],
            rg: 1 << J[0],
            lrk: 0,
            last: vec![0; width + 2],
            current: vec![0; width + 2],
        }
    }

    fn set_run_index(&mut self, index: usize) {
        self.run_index = index;
        self.rk = J[index];
        self.rg = 1 << self.rk;
    }

    /// Count update with periodic halving of A and B
    fn update_count(&mut self, ctx: usize) {
        if self.n[ctx] == RESET {
            self.a[ctx] >>= 1;
            self.b[ctx] = if self.b[ctx] >= 0 {
                self.b[ctx] >> 1
            } else {
                -((1 - self.b[ctx]) >> 1)
            };
            self.n[ctx] = RESET / 2 + 1;
        } else {
            self.n[ctx] += 1;
        }
    }
}

/// Golomb parameter: smallest k with N << k >= A
fn golomb_k(n: i32, a: i32) -> u32 {
    let mut k = 0;
    while k < 31 && ((n as i64) << k) < a as i64 {
        k += 1;
    }
    k
}

/// Decoder for one sample depth / error bound combination
#[derive(Debug, Clone)]
pub struct JlsDecoder {
    maxval: i32,
    near: i32,
    range: i32,
    qbpp: u32,
    limit: u32,
    predictor: Predictor,
}

impl JlsDecoder {
    pub fn new(maxval: u16, near: u16) -> Result<Self, RasterError> {
        if maxval == 0 {
            return Err(RasterError::InvalidParameters("maxval is 0".to_string()));
        }
        if near as u32 * 2 > maxval as u32 {
            return Err(RasterError::InvalidParameters(format!(
                "near {} too large for maxval {}",
                near, maxval
            )));
        }

        let maxval = maxval as i32;
        let near = near as i32;
        let range = (maxval + 2 * near) / (2 * near + 1) + 1;
        // ceil(log2(range)); range is at least 2
        let qbpp = 32 - ((range - 1) as u32).leading_zeros();
        let bpp = (32 - (maxval as u32).leading_zeros()).max(2);
        let limit = 2 * (bpp + bpp.max(8));

        Ok(Self {
            maxval,
            near,
            range,
            qbpp,
            limit: limit - qbpp - 1,
            predictor: Predictor::default(),
        })
    }

    pub fn with_predictor(mut self, predictor: Predictor) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn range(&self) -> i32 {
        self.range
    }

    pub fn qbpp(&self) -> u32 {
        self.qbpp
    }

    /// Unary prefix limit of regular mode codes
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Decode a `width` x `height` image. Any truncation or inconsistency
    /// aborts the whole image.
    pub fn decode(
        &self,
        data: &[u8],
        width: usize,
        height: usize,
    ) -> Result<SampleMatrix, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidParameters(format!(
                "empty image {}x{}",
                width, height
            )));
        }

        let mut ctx = Context::new(width, self.range);
        let mut bs = BitStream::new(data);
        let mut image = SampleMatrix::new(width, height);

        for row in 0..height {
            self.read_line(&mut bs, &mut ctx)?;
            for (dst, &src) in image.row_mut(row).iter_mut().zip(&ctx.current[1..=width]) {
                *dst = src as u16;
            }
            std::mem::swap(&mut ctx.last, &mut ctx.current);
        }

        Ok(image)
    }

    fn predict(&self, ra: i32, rb: i32, rc: i32) -> i32 {
        match self.predictor {
            Predictor::MedianEdge => {
                if rc >= ra.max(rb) {
                    ra.min(rb)
                } else if rc <= ra.min(rb) {
                    ra.max(rb)
                } else {
                    ra + rb - rc
                }
            }
            Predictor::Planar => (ra + rb - rc).clamp(0, self.maxval),
        }
    }

    /// Modular reduction into the sample range, then clamp
    fn reconstruct(&self, value: i32) -> i32 {
        let mut rx = value;
        if rx < -self.near {
            rx += (2 * self.near + 1) * self.range;
        } else if rx > self.maxval + self.near {
            rx -= (2 * self.near + 1) * self.range;
        }
        rx.clamp(0, self.maxval)
    }

    /// Length limited Golomb-Rice code. A unary prefix reaching `limit`
    /// escapes to a fixed `qbpp` bit value.
    fn decode_error(&self, bs: &mut BitStream, limit: u32, k: u32) -> Result<u32, RasterError> {
        let mut prefix = 0u32;
        loop {
            let zeros = bs.peek().leading_zeros().min(8);
            if zeros < 8 {
                prefix += zeros;
                bs.consume(zeros + 1)?;
                break;
            }
            prefix += 8;
            bs.consume(8)?;
        }

        if prefix < limit {
            if k == 0 {
                return Ok(prefix);
            }
            let value = (bs.peek() >> (32 - k)) + (prefix << k);
            bs.consume(k)?;
            Ok(value)
        } else {
            let value = (bs.peek() >> (32 - self.qbpp)) + 1;
            bs.consume(self.qbpp)?;
            Ok(value)
        }
    }

    /// Length of a run of samples equal to the left neighbour, at most
    /// `remaining`
    fn run_length(
        &self,
        bs: &mut BitStream,
        ctx: &mut Context,
        remaining: u32,
    ) -> Result<u32, RasterError> {
        let mut count = 0u32;

        loop {
            let ones = bs.peek().leading_ones().min(8);

            for i in 0..ones {
                count += ctx.rg;
                if count <= remaining && ctx.run_index < 31 {
                    ctx.set_run_index(ctx.run_index + 1);
                }
                if count >= remaining {
                    bs.consume(i + 1)?;
                    return Ok(remaining);
                }
            }

            if ones != 8 {
                bs.consume(ones + 1)?;

                let samples = if ctx.rk > 0 {
                    let residual = bs.peek() >> (32 - ctx.rk);
                    bs.consume(ctx.rk)?;
                    residual + count
                } else {
                    count
                };

                ctx.lrk = ctx.rk + 1;
                if ctx.run_index != 0 {
                    ctx.set_run_index(ctx.run_index - 1);
                }
                return Ok(samples);
            }

            bs.consume(8)?;
        }
    }

    fn read_line(&self, bs: &mut BitStream, ctx: &mut Context) -> Result<(), RasterError> {
        let width = ctx.width;
        let mut ra = ctx.last[1];
        let mut rb = ctx.last[1];
        let mut rc = ctx.last[0];
        let mut col = 1usize;

        ctx.current[0] = ctx.last[1];

        while col <= width {
            let rx;

            if (rb - ra).abs() > self.near {
                // Regular mode
                let px = self.predict(ra, rb, rc);
                let k = golomb_k(ctx.n[1], ctx.a[1]);
                let merrval = self.decode_error(bs, self.limit, k)? as i32;

                let (mut mes, mut meh) = if merrval & 1 == 1 {
                    let meh = (merrval + 1) >> 1;
                    (-meh, meh)
                } else {
                    (merrval >> 1, merrval >> 1)
                };
                if self.near == 0 && k == 0 && ctx.b[1] * 2 <= -ctx.n[1] {
                    meh = mes + 1;
                    mes = -mes - 1;
                    if merrval & 1 == 1 {
                        meh = mes;
                    }
                } else {
                    mes *= 2 * self.near + 1;
                }

                let errval = if ra < rb { mes } else { -mes };
                rx = self.reconstruct(px + errval);

                ctx.a[1] += meh;
                ctx.b[1] += mes;
                ctx.update_count(1);

                // Bias correction
                if ctx.b[1] <= -ctx.n[1] {
                    ctx.b[1] += ctx.n[1];
                    if ctx.b[1] <= -ctx.n[1] {
                        ctx.b[1] = 1 - ctx.n[1];
                    }
                } else if ctx.b[1] > 0 {
                    ctx.b[1] -= ctx.n[1];
                    if ctx.b[1] > 0 {
                        ctx.b[1] = 0;
                    }
                }

                rc = rb;
                rb = ctx.last[col + 1];
            } else {
                // Run mode
                let samples = self.run_length(bs, ctx, (width - col + 1) as u32)? as usize;

                if samples != 0 {
                    if col + samples > width + 1 {
                        return Err(RasterError::CorruptData(format!(
                            "run of {} samples at column {} overflows row of {}",
                            samples, col, width
                        )));
                    }
                    ctx.current[col..col + samples].fill(ra);
                    col += samples;

                    if col > width {
                        break;
                    }
                    rc = ctx.last[col];
                    rb = ctx.last[col + 1];
                } else {
                    rc = rb;
                    rb = ctx.last[col + 1];
                }

                // Run interruption sample
                let rctx = ((rc - ra).abs() <= self.near) as usize;
                let ictx = rctx + 2;
                let mut temp = ctx.a[ictx];
                if rctx == 1 {
                    temp += ctx.n[ictx] >> 1;
                }
                let k = golomb_k(ctx.n[ictx], temp);
                let limit = self.limit.saturating_sub(ctx.lrk);
                let merrval = self.decode_error(bs, limit, k)? as i32;

                let s = if k == 0 && (rctx == 1 || merrval != 0) {
                    (ctx.b[ictx] * 2 < ctx.n[ictx]) as i32
                } else {
                    0
                };

                let mut errval = merrval + rctx as i32 + s;
                let evh;
                if errval & 1 == 0 {
                    errval /= 2;
                    evh = errval;
                } else {
                    errval = s - ((errval + 1) >> 1);
                    evh = -errval;
                    ctx.b[ictx] += 1;
                }
                errval *= 2 * self.near + 1;

                let value = if rctx == 0 {
                    if ra == rc {
                        return Err(RasterError::CorruptData(format!(
                            "run interruption without a difference at column {}",
                            col
                        )));
                    }
                    if ra < rc {
                        rc + errval
                    } else {
                        rc - errval
                    }
                } else {
                    ra + errval
                };
                rx = self.reconstruct(value);

                ctx.a[ictx] += evh - rctx as i32;
                ctx.update_count(ictx);
            }

            ctx.current[col] = rx;
            ra = rx;
            col += 1;
        }

        Ok(())
    }
}
