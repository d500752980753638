use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;

use crate::commons::{Access, Addr, Op};
use crate::error::{Error, Result};

/// Reads a trace file of `<proc> <op> <hex address>` lines.
pub fn read_trace<P: AsRef<Path>>(path: P) -> Result<Vec<Access>> {
    let path = path.as_ref();
    info!("reading trace file: {:?}", path);
    let f = File::open(path)?;
    parse_trace(BufReader::new(f))
}

pub fn parse_trace<R: BufRead>(reader: R) -> Result<Vec<Access>> {
    let mut trace = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        trace.push(parse_line(&line).map_err(|reason| Error::Trace { line: i + 1, reason })?);
    }
    Ok(trace)
}

fn parse_line(line: &str) -> std::result::Result<Access, String> {
    let mut parts = line.split_whitespace();
    let (Some(proc), Some(op), Some(addr)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected `<proc> <op> <address>`, got `{line}`"));
    };
    let proc = proc
        .parse::<usize>()
        .map_err(|e| format!("bad processor `{proc}`: {e}"))?;
    let mut codes = op.chars();
    let op = match (codes.next(), codes.next()) {
        (Some(c), None) => Op::from_code(c),
        _ => return Err(format!("bad operation `{op}`")),
    };
    let hex = addr.trim_start_matches("0x").trim_start_matches("0X");
    let addr = u64::from_str_radix(hex, 16).map_err(|e| format!("bad address `{addr}`: {e}"))?;
    Ok(Access { proc, op, addr: Addr(addr) })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_trace() {
        let text = "0 r 0x40\n1 w 7ffe\n\n2 x 10\n";
        let trace = parse_trace(text.as_bytes()).unwrap();
        assert_eq!(
            trace,
            vec![Access::read(0, 0x40), Access::write(1, 0x7ffe), Access::read(2, 0x10)]
        );
    }

    #[test]
    fn test_malformed_lines() {
        let err = parse_trace("0 r 10\n1 r\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Trace { line: 2, .. }));
        assert!(parse_trace("a r 10\n".as_bytes()).is_err());
        assert!(parse_trace("0 rw 10\n".as_bytes()).is_err());
        assert!(parse_trace("0 r zz\n".as_bytes()).is_err());
    }
}
