use rust_htslib::bam::record::{Cigar, CigarString};

use crate::runtime::AlignerParams;

const NEG: i32 = i32::MIN / 4;

// traceback byte: low 3 bits say where H came from, the high bits whether each gap
// state was extended (set) or opened from H (clear)
const SRC_ZERO: u8 = 0;
const SRC_DIAG: u8 = 1;
const SRC_DEL: u8 = 2;
const SRC_DEL_LONG: u8 = 3;
const SRC_INS: u8 = 4;
const SRC_INS_LONG: u8 = 5;
const DEL_EXT: u8 = 1 << 3;
const DEL_LONG_EXT: u8 = 1 << 4;
const INS_EXT: u8 = 1 << 5;
const INS_LONG_EXT: u8 = 1 << 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Match,
    Del,
    DelLong,
    Ins,
    InsLong,
}

/// Local alignment of a query against a target window. Intervals are half-open
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extension {
    pub score: i32,
    pub q_start: usize,
    pub q_end: usize,
    pub t_start: usize,
    pub t_end: usize,
    pub cigar: CigarString,
}

/// Best of opening a gap from `h` or extending `gap`; the flag says it was extended
#[inline(always)]
fn gap(h: i32, gap: i32, open: i32, extend: i32) -> (i32, bool) {
    let opened = h - (open + extend);
    let extended = gap - extend;
    if extended >= opened {
        (extended, true)
    } else {
        (opened, false)
    }
}

fn push_op(ops: &mut Vec<(u8, u32)>, op: u8) {
    match ops.last_mut() {
        Some((last, len)) if *last == op => *len += 1,
        _ => ops.push((op, 1)),
    }
}

/// Banded local alignment with two-piece affine gaps (a gap of length l costs the
/// cheaper of `q + l*e` and `q2 + l*e2`). Cells are limited to `|j - i - diag| <= band`.
/// Reaching either end of the query earns `end_bonus`. Rows stop once the best row
/// score falls `zdrop` below the best score seen
pub fn align_banded(
    query: &[u8],
    target: &[u8],
    diag: i64,
    band: usize,
    params: &AlignerParams,
    zdrop: i32,
) -> Option<Extension> {
    let m = query.len();
    let n = target.len();
    if m == 0 || n == 0 {
        return None;
    }
    let band = band.min(m + n);
    let width = 2 * band + 1;
    let (a, b) = (params.match_score, params.mismatch_penalty);
    let (q1, e1) = (params.gap_open, params.gap_extend);
    let (q2, e2) = (params.gap_open_long, params.gap_extend_long);

    let band_lo = |i: usize| i as i64 + diag - band as i64;

    let mut h_prev = vec![params.end_bonus; n + 1];
    let mut h_cur = vec![NEG; n + 1];
    let mut ins_prev = vec![NEG; n + 1];
    let mut ins_cur = vec![NEG; n + 1];
    let mut ins2_prev = vec![NEG; n + 1];
    let mut ins2_cur = vec![NEG; n + 1];
    let mut tb = vec![SRC_ZERO; (m + 1) * width];

    // (score, i, j) of the best cell, with and without the query end bonus
    let mut best_raw = (0, 0usize, 0usize);
    let mut best = (0, 0usize, 0usize);

    for i in 1..=m {
        let j_lo = band_lo(i).max(1);
        let j_hi = (i as i64 + diag + band as i64).min(n as i64);
        if j_lo > n as i64 {
            break;
        }
        if j_lo > j_hi {
            h_cur.fill(NEG);
            ins_cur.fill(NEG);
            ins2_cur.fill(NEG);
        } else {
            let clear_lo = (j_lo - 1) as usize;
            let clear_hi = ((j_hi + 1) as usize).min(n);
            for v in [&mut h_cur, &mut ins_cur, &mut ins2_cur] {
                v[clear_lo..=clear_hi].fill(NEG);
            }

            let qb = query[i - 1];
            let (mut del, mut del2) = (NEG, NEG);
            let mut h_left = NEG;
            let mut row_best = (NEG, 0usize);
            let row_off = band_lo(i);

            for j in j_lo as usize..=j_hi as usize {
                let mut flags = 0u8;

                let (d, ext) = gap(h_left, del, q1, e1);
                del = d;
                if ext {
                    flags |= DEL_EXT;
                }
                let (d, ext) = gap(h_left, del2, q2, e2);
                del2 = d;
                if ext {
                    flags |= DEL_LONG_EXT;
                }
                let (f, ext) = gap(h_prev[j], ins_prev[j], q1, e1);
                ins_cur[j] = f;
                if ext {
                    flags |= INS_EXT;
                }
                let (f, ext) = gap(h_prev[j], ins2_prev[j], q2, e2);
                ins2_cur[j] = f;
                if ext {
                    flags |= INS_LONG_EXT;
                }

                let tb_base = target[j - 1];
                let is_match = qb.eq_ignore_ascii_case(&tb_base) && !matches!(qb, b'N' | b'n');
                let diag_score = h_prev[j - 1] + if is_match { a } else { -b };

                let mut h = 0;
                let mut src = SRC_ZERO;
                for (score, from) in [
                    (diag_score, SRC_DIAG),
                    (del, SRC_DEL),
                    (del2, SRC_DEL_LONG),
                    (ins_cur[j], SRC_INS),
                    (ins2_cur[j], SRC_INS_LONG),
                ] {
                    if score > h {
                        h = score;
                        src = from;
                    }
                }
                h_cur[j] = h;
                h_left = h;
                tb[i * width + (j as i64 - row_off) as usize] = src | flags;

                if h > row_best.0 {
                    row_best = (h, j);
                }
                // alignments end on a matching base
                if src == SRC_DIAG && is_match {
                    if h > best_raw.0 {
                        best_raw = (h, i, j);
                    }
                    let bonus = if i == m { params.end_bonus } else { 0 };
                    if h + bonus > best.0 {
                        best = (h + bonus, i, j);
                    }
                }
            }

            let (best_score, bi, bj) = best_raw;
            if best_score > 0 {
                let drift = (i as i64 - bi as i64) - (row_best.1 as i64 - bj as i64);
                let drop = best_score - row_best.0.max(0);
                if drop > zdrop + e1 * drift.unsigned_abs() as i32 {
                    break;
                }
            }
        }
        std::mem::swap(&mut h_prev, &mut h_cur);
        std::mem::swap(&mut ins_prev, &mut ins_cur);
        std::mem::swap(&mut ins2_prev, &mut ins2_cur);
    }

    let (score, end_i, end_j) = best;
    if score <= 0 || end_i == 0 {
        return None;
    }

    let mut ops: Vec<(u8, u32)> = Vec::new();
    let (mut i, mut j) = (end_i, end_j);
    let mut state = State::Match;
    while i > 0 && j > 0 {
        let off = j as i64 - band_lo(i);
        if off < 0 || off >= width as i64 {
            break;
        }
        let cell = tb[i * width + off as usize];
        match state {
            State::Match => match cell & 0x7 {
                SRC_DIAG => {
                    push_op(&mut ops, b'M');
                    i -= 1;
                    j -= 1;
                }
                SRC_DEL => state = State::Del,
                SRC_DEL_LONG => state = State::DelLong,
                SRC_INS => state = State::Ins,
                SRC_INS_LONG => state = State::InsLong,
                _ => break,
            },
            State::Del | State::DelLong => {
                let ext_bit = if state == State::Del { DEL_EXT } else { DEL_LONG_EXT };
                push_op(&mut ops, b'D');
                j -= 1;
                if cell & ext_bit == 0 {
                    state = State::Match;
                }
            }
            State::Ins | State::InsLong => {
                let ext_bit = if state == State::Ins { INS_EXT } else { INS_LONG_EXT };
                push_op(&mut ops, b'I');
                i -= 1;
                if cell & ext_bit == 0 {
                    state = State::Match;
                }
            }
        }
    }
    ops.reverse();

    let cigar = ops
        .into_iter()
        .map(|(op, len)| match op {
            b'M' => Cigar::Match(len),
            b'I' => Cigar::Ins(len),
            _ => Cigar::Del(len),
        })
        .collect();

    Some(Extension {
        score,
        q_start: i,
        q_end: end_i,
        t_start: j,
        t_end: end_j,
        cigar: CigarString(cigar),
    })
}
