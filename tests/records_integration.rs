//! Record iteration across sources.
//!
//! Seekable and sequential inputs must produce identical records, however
//! the sequential input happens to chunk its reads.

use binops::prelude::*;
use binops::{parse_fields, parse_unpack};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::io::{Cursor, Read, Write};
use tempfile::NamedTempFile;

// =============================================================================
// Helper functions
// =============================================================================

/// A reader that hands out data in random small pieces, like a slow pipe.
struct Trickle<R> {
    inner: R,
    rng: SmallRng,
    max_chunk: usize,
}

impl<R: Read> Read for Trickle<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = self.rng.gen_range(1..=self.max_chunk).min(buf.len());
        self.inner.read(&mut buf[..n])
    }
}

fn trickle(data: &[u8], seed: u64) -> Sequential<Trickle<&[u8]>> {
    Sequential::new(Trickle {
        inner: data,
        rng: SmallRng::seed_from_u64(seed),
        max_chunk: 7,
    })
}

fn iota_matrix(rows: u8, cols: u8) -> Vec<u8> {
    (0..rows)
        .flat_map(|r| (0..cols).map(move |c| (r << 4).wrapping_add(c)))
        .collect()
}

fn render<S: Pread>(sp: &mut SeekablePipe<S>, width: Width, skip: u64, ops: &[WriteOp]) -> Vec<u8> {
    let mut out = Vec::new();
    sp.each_record(width, skip)
        .try_for_each(|record| {
            record.scripted_write(&mut out, ops)?;
            out.push(b'|');
            Ok(())
        })
        .unwrap();
    out
}

fn script() -> Vec<WriteOp> {
    let mut ops = parse_fields("..,-1,0..1").unwrap();
    ops.push(WriteOp::Literal(b"/".to_vec()));
    ops.extend(parse_unpack("0..3:S<*?%d").unwrap());
    ops
}

// =============================================================================
// Equivalence of seekable and sequential sources
// =============================================================================

#[test]
fn test_fixed_width_pipe_matches_file() {
    let mut rng = SmallRng::seed_from_u64(0xb1d5);
    let ops = script();
    for round in 0..200 {
        let len = rng.gen_range(0..300);
        let data: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        let width = Width::fixed(rng.gen_range(1..20)).unwrap();
        let skip = rng.gen_range(0..10);

        let expected = render(&mut SeekablePipe::new(Cursor::new(&data[..])), width, skip, &ops);
        let actual = render(&mut SeekablePipe::new(trickle(&data, round)), width, skip, &ops);
        assert_eq!(actual, expected, "round {round}: len={len} width={width:?} skip={skip}");
    }
}

#[test]
fn test_variable_length_pipe_matches_file() {
    let mut rng = SmallRng::seed_from_u64(0x71e5);
    let vlen = Vlen::parse("0..1:S>+2").unwrap();
    let ops = script();
    for round in 0..100 {
        let mut data = Vec::new();
        for _ in 0..rng.gen_range(0..12) {
            let body = rng.gen_range(0..40u16);
            data.extend_from_slice(&body.to_be_bytes());
            data.extend((0..body).map(|_| rng.gen::<u8>()));
        }
        // sometimes cut the last record short
        if !data.is_empty() && rng.gen_bool(0.3) {
            data.truncate(rng.gen_range(0..data.len()));
        }

        let expected = render(&mut SeekablePipe::new(Cursor::new(&data[..])), vlen.into(), 0, &ops);
        let actual = render(&mut SeekablePipe::new(trickle(&data, round)), vlen.into(), 0, &ops);
        assert_eq!(actual, expected, "round {round}");
    }
}

#[test]
fn test_forward_reads_pipe_matches_file() {
    let mut rng = SmallRng::seed_from_u64(42);
    let data: Vec<u8> = (0..4096).map(|i| (i % 251) as u8).collect();
    let mut file = SeekablePipe::new(Cursor::new(&data[..]));
    let mut pipe = SeekablePipe::new(trickle(&data, 7));

    let mut offset = 0u64;
    // furthest byte requested so far; the pipe may only discard up to here
    let mut high = 0u64;
    while offset < 4200 {
        let maxlen = rng.gen_range(0..64);
        let a = file.pread(maxlen, offset).unwrap().map(<[u8]>::to_vec);
        let b = pipe.pread(maxlen, offset).unwrap().map(<[u8]>::to_vec);
        assert_eq!(a, b, "offset {offset} maxlen {maxlen}");
        high = high.max(offset + maxlen as u64);
        if rng.gen_bool(0.3) {
            pipe.discard();
            offset = high;
        } else {
            offset += rng.gen_range(0..=maxlen as u64);
        }
    }
    assert!(pipe.is_buffered());
    assert!(pipe.is_eof());
}

// =============================================================================
// Real descriptors
// =============================================================================

#[test]
fn test_file_records() {
    let mut tmp = NamedTempFile::new().unwrap();
    tmp.write_all(&iota_matrix(8, 16)).unwrap();
    tmp.flush().unwrap();

    let mut sp = SeekablePipe::new(tmp.reopen().unwrap());
    let ops = parse_fields("..3").unwrap();
    let mut limit = Limit::new(Some(4));
    let mut out = Vec::new();
    sp.each_record_filtered(Width::fixed(15).unwrap(), 0, &[], &mut limit)
        .try_for_each(|record| record.scripted_write(&mut out, &ops).map(drop))
        .unwrap();
    assert_eq!(
        out,
        [
            0x00, 0x01, 0x02, 0x03, 0x0f, 0x10, 0x11, 0x12, 0x1e, 0x1f, 0x20, 0x21, 0x2d, 0x2e, 0x2f, 0x30
        ]
    );
    assert!(!sp.is_buffered());
}

#[cfg(unix)]
#[test]
fn test_socket_records() {
    use std::fs::File;
    use std::os::fd::OwnedFd;
    use std::os::unix::net::UnixStream;

    let data = iota_matrix(4, 16);
    let (mut tx, rx) = UnixStream::pair().unwrap();
    tx.write_all(&data).unwrap();
    drop(tx);

    let mut sp = SeekablePipe::new(File::from(OwnedFd::from(rx)));
    let records = render(&mut sp, Width::fixed(16).unwrap(), 7, &parse_fields("..-2").unwrap());
    assert!(sp.is_buffered());

    let mut expected = Vec::new();
    for start in [7usize, 23, 39] {
        expected.extend_from_slice(&data[start..start + 15]);
        expected.push(b'|');
    }
    expected.extend_from_slice(&data[55..]);
    expected.push(b'|');
    assert_eq!(records, expected);
}

#[test]
fn test_limit_across_inputs() {
    let data = iota_matrix(4, 16);
    let filters = [Filter::parse("0&10!=0").unwrap()];
    let mut limit = Limit::new(Some(3));
    let mut firsts = Vec::new();
    for seed in 0..3 {
        let mut sp = SeekablePipe::new(trickle(&data, seed));
        sp.each_record_filtered(Width::fixed(16).unwrap(), 0, &filters, &mut limit)
            .try_for_each(|record| {
                firsts.push(record.to_vec()?[0]);
                Ok(())
            })
            .unwrap();
    }
    assert_eq!(firsts, vec![0x10, 0x30, 0x10]);
    assert!(limit.is_exhausted());
}
