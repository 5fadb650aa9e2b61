//! Compact text encoding of a graph.
//!
//! ```text
//! bias;role;slot,bias;role;slot,...|weight;from;towards,weight;from;towards,...
//! ```
//!
//! - `|` separates the neuron records from the link records.
//! - `,` terminates every record.
//! - `;` separates the three fields of a record.
//!
//! Neuron records follow insertion order. `role` is the [`Role::code`] and
//! `slot` is the output slot, or `-1` for inputs and hidden neurons. Link
//! records reference neurons by their position in the neuron list.
//!
//! Floats are written in Rust's shortest round-trip form, so a restored graph
//! carries bit-identical parameters. The parser accepts any decimal form,
//! including fixed six-digit output from other writers.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use log::{debug, warn};
use slotmap::SecondaryMap;

use crate::error::NeatError;
use crate::gene::{Neuron, NeuronId, Role};
use crate::graph::Graph;

const GROUP_SEPARATOR: char = '|';
const RECORD_TERMINATOR: char = ',';
const FIELD_SEPARATOR: char = ';';

/// Settle the graph, drop dangling links and encode it.
pub fn serialize(graph: &mut Graph) -> String {
    graph.update_layers();
    let dropped = graph.drop_dangling_links();
    if dropped > 0 {
        warn!("dropped {dropped} links with missing endpoints before serializing");
    }
    graph.to_string()
}

/// Rebuild a graph from its text encoding.
///
/// Links are re-added through [`Graph::add_link`] inside one batch, so the
/// usual link policy applies, followed by a single settle pass.
///
/// # Errors
///
/// Returns [`NeatError::CorruptFormat`] if the text does not have exactly two
/// groups, a record does not have exactly three fields, a number or role code
/// does not parse, a link references a missing neuron, or output slots are not
/// exactly `0..out_size`.
pub fn restore(text: &str) -> Result<Graph, NeatError> {
    let groups: Vec<&str> = text.trim().split(GROUP_SEPARATOR).collect();
    let [neuron_group, link_group] = groups.as_slice() else {
        return Err(NeatError::corrupt(format!(
            "expected 2 groups separated by '{GROUP_SEPARATOR}', found {}",
            groups.len()
        )));
    };

    let neurons = records(neuron_group)
        .enumerate()
        .map(|(i, record)| parse_neuron(i, record))
        .collect::<Result<Vec<_>, _>>()?;
    check_output_slots(&neurons)?;

    let links = records(link_group)
        .enumerate()
        .map(|(i, record)| parse_link(i, record, neurons.len()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut graph = Graph::empty();
    graph.batch(|g| {
        let ids: Vec<NeuronId> = neurons.into_iter().map(|n| g.push_neuron(n)).collect();
        for (weight, from, towards) in links {
            g.add_link(ids[from], ids[towards], weight);
        }
    });
    debug!(
        "restored graph: {} neurons, {} links, {} layers",
        graph.neuron_count(),
        graph.link_count(),
        graph.layers().len()
    );
    Ok(graph)
}

/// Records of one group. A trailing empty segment (after the final terminator)
/// is not a record.
fn records(group: &str) -> impl Iterator<Item = &str> + '_ {
    let group = group.strip_suffix(RECORD_TERMINATOR).unwrap_or(group);
    group
        .split(RECORD_TERMINATOR)
        .filter(move |_| !group.is_empty())
}

fn fields<'a>(record: &'a str, kind: &str, index: usize) -> Result<[&'a str; 3], NeatError> {
    let parts: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
    let found = parts.len();
    <[&str; 3]>::try_from(parts).map_err(|_| {
        NeatError::corrupt(format!(
            "{kind} record {index} has {found} fields, expected 3"
        ))
    })
}

fn number<T: FromStr>(text: &str, what: &str, index: usize) -> Result<T, NeatError> {
    text.trim().parse().map_err(|_| {
        NeatError::corrupt(format!("{what} of record {index} is not valid: {text:?}"))
    })
}

fn parse_neuron(index: usize, record: &str) -> Result<Neuron, NeatError> {
    let [bias, role, slot] = fields(record, "neuron", index)?;
    let bias: f64 = number(bias, "bias", index)?;
    let code: u8 = number(role, "role", index)?;
    let role = Role::from_code(code)
        .ok_or_else(|| NeatError::corrupt(format!("unknown role code {code} in record {index}")))?;
    let slot: i64 = number(slot, "output slot", index)?;

    match (role, usize::try_from(slot)) {
        (Role::Output, Ok(slot)) => Ok(Neuron::output(bias, slot)),
        (Role::Input, Err(_)) if slot == -1 => Ok(Neuron::input(bias)),
        (Role::Hidden, Err(_)) if slot == -1 => Ok(Neuron::hidden(bias)),
        _ => Err(NeatError::corrupt(format!(
            "record {index}: output slot {slot} does not fit role code {code}"
        ))),
    }
}

fn parse_link(
    index: usize,
    record: &str,
    neuron_count: usize,
) -> Result<(f64, usize, usize), NeatError> {
    let [weight, from, towards] = fields(record, "link", index)?;
    let weight: f64 = number(weight, "weight", index)?;
    let from: usize = number(from, "source index", index)?;
    let towards: usize = number(towards, "target index", index)?;
    if from >= neuron_count || towards >= neuron_count {
        return Err(NeatError::corrupt(format!(
            "link record {index} references neuron {} but only {neuron_count} exist",
            from.max(towards)
        )));
    }
    Ok((weight, from, towards))
}

fn check_output_slots(neurons: &[Neuron]) -> Result<(), NeatError> {
    let mut slots: Vec<usize> = neurons.iter().filter_map(|n| n.output_slot).collect();
    slots.sort_unstable();
    if slots.iter().enumerate().any(|(expected, &slot)| slot != expected) {
        return Err(NeatError::corrupt(format!(
            "output slots {slots:?} are not 0..{}",
            slots.len()
        )));
    }
    Ok(())
}

impl fmt::Display for Graph {
    /// Writes the text encoding. Links whose endpoints are missing are skipped;
    /// use [`serialize`] to also drop them from the graph.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut position: SecondaryMap<NeuronId, usize> =
            SecondaryMap::with_capacity(self.neuron_count());

        for (i, (id, neuron)) in self.neurons().enumerate() {
            position.insert(id, i);
            write!(
                f,
                "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}",
                neuron.bias,
                neuron.role.code()
            )?;
            match neuron.output_slot {
                Some(slot) => write!(f, "{slot}")?,
                None => f.write_str("-1")?,
            }
            f.write_char(RECORD_TERMINATOR)?;
        }

        f.write_char(GROUP_SEPARATOR)?;

        for (_, link) in self.links() {
            let (Some(&from), Some(&towards)) =
                (position.get(link.from), position.get(link.towards))
            else {
                continue;
            };
            write!(
                f,
                "{}{FIELD_SEPARATOR}{from}{FIELD_SEPARATOR}{towards}{RECORD_TERMINATOR}",
                link.weight
            )?;
        }
        Ok(())
    }
}

impl FromStr for Graph {
    type Err = NeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        restore(s)
    }
}
