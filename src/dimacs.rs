//! Reader and writer for the DIMACS max-flow format.
//!
//! Blank lines and lines starting with `c` are ignored. The remaining
//! lines are a problem line `p max <n> <m>`, two node lines `n <id> s`
//! and `n <id> t`, and exactly `m` arc lines `a <u> <v> <capacity>`.
//! Node ids are 1-based in the file and 0-based in [`FlowInstance`].

use std::{
    fs::File,
    io::{BufRead, BufReader, Read, Write},
    path::Path,
    str::{FromStr, SplitWhitespace},
};

use anyhow::{Context, bail};

use crate::instance::FlowInstance;

struct Line<'a> {
    number: usize,
    tokens: SplitWhitespace<'a>,
}

impl<'a> Line<'a> {
    fn next<T: FromStr>(&mut self, what: &str) -> anyhow::Result<T> {
        let number = self.number;
        let token = self
            .tokens
            .next()
            .with_context(|| format!("line {}: missing {}", number, what))?;
        token
            .parse()
            .map_err(|_| anyhow::anyhow!("line {}: invalid {} `{}`", number, what, token))
    }

    fn node(&mut self, n: usize, what: &str) -> anyhow::Result<usize> {
        let id: usize = self.next(what)?;
        if id < 1 || id > n {
            bail!(
                "line {}: invalid {} {} (must be in 1..={})",
                self.number,
                what,
                id,
                n
            );
        }
        Ok(id - 1)
    }

    fn end(&mut self) -> anyhow::Result<()> {
        match self.tokens.next() {
            Some(token) => bail!("line {}: unexpected trailing token `{}`", self.number, token),
            None => Ok(()),
        }
    }
}

pub fn read<R: Read>(r: R) -> anyhow::Result<FlowInstance> {
    let mut problem = None;
    let mut source = None;
    let mut sink = None;
    let mut arcs = Vec::new();

    for (index, text) in BufReader::new(r).lines().enumerate() {
        let text = text?;
        let mut tokens = text.split_whitespace();
        let Some(kind) = tokens.next() else {
            continue;
        };
        let mut line = Line {
            number: index + 1,
            tokens,
        };
        match kind {
            "c" => continue,
            "p" => {
                if problem.is_some() {
                    bail!("line {}: duplicate problem line", line.number);
                }
                let format: String = line.next("problem type")?;
                if format != "max" {
                    bail!("line {}: expected `max` problem, got `{}`", line.number, format);
                }
                let n: usize = line.next("node count")?;
                let m: usize = line.next("arc count")?;
                line.end()?;
                arcs.reserve(m);
                problem = Some((n, m));
            }
            "n" => {
                let Some((n, _)) = problem else {
                    bail!("line {}: node line before problem line", line.number);
                };
                let id = line.node(n, "node id")?;
                let terminal = match line.next::<String>("node type")?.as_str() {
                    "s" => &mut source,
                    "t" => &mut sink,
                    other => bail!(
                        "line {}: invalid node type, must be 's' or 't', got: {}",
                        line.number,
                        other
                    ),
                };
                if terminal.replace(id).is_some() {
                    bail!("line {}: duplicate terminal node", line.number);
                }
                line.end()?;
            }
            "a" => {
                let Some((n, _)) = problem else {
                    bail!("line {}: arc line before problem line", line.number);
                };
                let u = line.node(n, "arc tail")?;
                let v = line.node(n, "arc head")?;
                let cap: isize = line.next("capacity")?;
                line.end()?;
                if u == v {
                    bail!("line {}: invalid loop ({},{}) in arc", line.number, u + 1, v + 1);
                }
                arcs.push((u, v, cap));
            }
            other => bail!("line {}: unknown line type `{}`", line.number, other),
        }
    }

    let (n, m) = problem.context("missing problem line")?;
    if arcs.len() != m {
        bail!("expected {} arc lines, found {}", m, arcs.len());
    }
    let source = source.context("missing source node line")?;
    let sink = sink.context("missing sink node line")?;
    FlowInstance::from_arcs(n, source, sink, &arcs).map_err(Into::into)
}

pub fn read_from_file<S: AsRef<Path>>(path: S) -> anyhow::Result<FlowInstance> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    read(file).with_context(|| format!("failed to parse {}", path.display()))
}

/// Writes the positive-capacity arcs of `instance`.
pub fn write<W: Write>(mut w: W, instance: &FlowInstance) -> std::io::Result<()> {
    let arcs: Vec<_> = instance.arcs().collect();
    writeln!(w, "p max {} {}", instance.n, arcs.len())?;
    writeln!(w, "n {} s", instance.source + 1)?;
    writeln!(w, "n {} t", instance.sink + 1)?;
    for (u, v, cap) in arcs {
        writeln!(w, "a {} {} {}", u + 1, v + 1, cap)?;
    }
    Ok(())
}
