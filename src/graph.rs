//! Network graph with arena-allocated neurons and links.
//!
//! The [`Graph`] owns every [`Neuron`] and [`Link`] in `SlotMap` arenas and keeps
//! two insertion-order lists next to them. Insertion order is significant: the
//! first `in_size` neurons are the inputs, layers list neurons in that order, and
//! the text codec writes records in it.
//!
//! Every structural edit re-runs the layering pass from
//! [`topology`](crate::topology) unless a [batch](Graph::batch) is open, so the
//! graph is always ready for one-pass forward evaluation between calls.

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::gene::{Link, LinkId, Neuron, NeuronId, Role};
use crate::random::RandomSource;
use crate::topology::Layering;

/// Weight of the link leaving the neuron inserted by [`Graph::split_link`].
pub const SPLIT_OUTGOING_WEIGHT: f64 = 1.0;

/// How [`Graph::add_link`] resolves a requested `(from, towards)` pair.
///
/// Rules are checked in declaration order; the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPolicy {
    /// The pair is already linked; only the weight is replaced.
    Overwrite(LinkId),
    /// Unknown handle, input→input or output→output.
    Reject,
    /// The link would enter an input, leave an output, or `from` sits deeper
    /// than `towards`; the reversed link is created instead.
    Reverse,
    /// A fresh link is created.
    Insert,
}

/// A layered feed-forward network whose topology can grow and shrink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub(crate) neurons: SlotMap<NeuronId, Neuron>,
    pub(crate) links: SlotMap<LinkId, Link>,
    /// Neuron handles in insertion order.
    pub(crate) neuron_order: Vec<NeuronId>,
    /// Link handles in insertion order.
    pub(crate) link_order: Vec<LinkId>,
    /// Layer 0 holds the inputs, the last layer holds the outputs.
    pub(crate) layers: Vec<Vec<NeuronId>>,
    pub(crate) input_ids: Vec<NeuronId>,
    /// Output neurons ordered by slot.
    pub(crate) output_ids: Vec<NeuronId>,
    #[serde(skip)]
    pub(crate) batch_depth: u32,
}

impl Graph {
    pub(crate) fn empty() -> Self {
        Self {
            neurons: SlotMap::with_key(),
            links: SlotMap::with_key(),
            neuron_order: Vec::new(),
            link_order: Vec::new(),
            layers: Vec::new(),
            input_ids: Vec::new(),
            output_ids: Vec::new(),
            batch_depth: 0,
        }
    }

    /// Inputs and outputs only, zero biases and no links.
    #[must_use]
    pub fn unconnected(in_size: usize, out_size: usize) -> Self {
        let mut graph = Self::empty();
        graph.batch(|g| {
            for _ in 0..in_size {
                g.push_neuron(Neuron::input(0.0));
            }
            for slot in 0..out_size {
                g.push_neuron(Neuron::output(0.0, slot));
            }
        });
        graph
    }

    /// Build a layered network and randomize all of its parameters.
    ///
    /// Creates `in_size` inputs, `hidden_layers` groups of `in_size` hidden
    /// neurons each, and `out_size` outputs. Each group is fully connected to the
    /// next one (inputs → first hidden group → … → outputs).
    pub fn new<R: RandomSource + ?Sized>(
        in_size: usize,
        out_size: usize,
        hidden_layers: usize,
        rng: &mut R,
    ) -> Self {
        let mut graph = Self::empty();
        graph.batch(|g| {
            let mut groups: Vec<Vec<NeuronId>> = Vec::with_capacity(hidden_layers + 2);
            groups.push((0..in_size).map(|_| g.push_neuron(Neuron::input(0.0))).collect());
            for _ in 0..hidden_layers {
                groups.push((0..in_size).map(|_| g.push_neuron(Neuron::hidden(0.0))).collect());
            }
            groups.push(
                (0..out_size)
                    .map(|slot| g.push_neuron(Neuron::output(0.0, slot)))
                    .collect(),
            );

            for pair in groups.windows(2) {
                for &from in &pair[0] {
                    for &towards in &pair[1] {
                        g.add_link(from, towards, 0.0);
                    }
                }
            }
        });
        graph.randomize(rng);
        debug!(
            "built graph: {} inputs, {} outputs, {} hidden groups, {} links",
            in_size,
            out_size,
            hidden_layers,
            graph.link_count()
        );
        graph
    }

    /// Insert a neuron at the end of the insertion order.
    pub(crate) fn push_neuron(&mut self, neuron: Neuron) -> NeuronId {
        let role = neuron.role;
        let slot = neuron.output_slot;
        let id = self.neurons.insert(neuron);
        self.neuron_order.push(id);
        match role {
            Role::Input => self.input_ids.push(id),
            Role::Output => {
                let neurons = &self.neurons;
                let at = self
                    .output_ids
                    .partition_point(|&o| neurons.get(o).and_then(|n| n.output_slot) < slot);
                self.output_ids.insert(at, id);
            }
            Role::Hidden => {}
        }
        id
    }

    // ------------------------------------------------------------------
    // Batch mode
    // ------------------------------------------------------------------

    /// Run `edit` with layer recomputation suspended, then settle once.
    ///
    /// Batches nest; only the outermost one settles. Inside the closure layers
    /// may be stale and evaluation is refused.
    pub fn batch<T>(&mut self, edit: impl FnOnce(&mut Self) -> T) -> T {
        self.batch_depth += 1;
        let out = edit(self);
        self.batch_depth -= 1;
        self.update_layers();
        out
    }

    /// `true` when no batch is open and layers reflect the current topology.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.batch_depth == 0
    }

    /// Recompute layers and prune unreachable neurons, unless a batch is open.
    pub fn update_layers(&mut self) {
        if self.batch_depth > 0 {
            return;
        }

        let layering = Layering::compute(self);
        for neuron in self.neurons.values_mut() {
            neuron.layer = None;
        }
        for (depth, layer) in layering.layers.iter().enumerate() {
            for &id in layer {
                if let Some(neuron) = self.neurons.get_mut(id) {
                    neuron.layer = Some(depth);
                }
            }
        }
        trace!(
            "layered {} neurons into {} layers",
            self.neurons.len(),
            layering.depth()
        );

        if !layering.unreachable.is_empty() {
            debug!(
                "pruning {} unreachable neurons",
                layering.unreachable.len()
            );
            self.prune(&layering.unreachable);
        }
        self.layers = layering.layers;
    }

    /// Drop neurons and their links in one filter pass over the insertion order.
    fn prune(&mut self, dead: &[NeuronId]) {
        for &id in dead {
            let Some(neuron) = self.neurons.get(id) else {
                continue;
            };
            let incident: Vec<LinkId> = neuron
                .outgoing
                .iter()
                .chain(&neuron.incoming)
                .copied()
                .collect();
            for link in incident {
                self.detach_link(link);
            }
            self.neurons.remove(id);
        }
        let neurons = &self.neurons;
        self.neuron_order.retain(|&id| neurons.contains_key(id));
    }

    // ------------------------------------------------------------------
    // Mutation primitives
    // ------------------------------------------------------------------

    /// Decide what [`add_link`](Self::add_link) would do for this pair.
    ///
    /// A link into an input or out of an output is always reversed, whether or
    /// not the other endpoint has been layered yet. Otherwise endpoints are
    /// compared by layer once both sides carry one. A hidden self-loop is
    /// inserted; the settle pass then prunes the neuron as unreachable.
    #[must_use]
    pub fn link_policy(&self, from: NeuronId, towards: NeuronId) -> LinkPolicy {
        let (Some(source), Some(target)) = (self.neurons.get(from), self.neurons.get(towards))
        else {
            return LinkPolicy::Reject;
        };

        if let Some(existing) = self.find_link(from, towards) {
            return LinkPolicy::Overwrite(existing);
        }
        if source.role == target.role && matches!(source.role, Role::Input | Role::Output) {
            return LinkPolicy::Reject;
        }
        if target.role == Role::Input || source.role == Role::Output {
            return LinkPolicy::Reverse;
        }
        match (depth_rank(source), depth_rank(target)) {
            (Some(a), Some(b)) if a > b => LinkPolicy::Reverse,
            _ => LinkPolicy::Insert,
        }
    }

    /// Link two neurons, resolving the request through [`LinkPolicy`].
    ///
    /// Returns the handle of the link now carrying `weight`, or `None` if the
    /// request was rejected.
    pub fn add_link(&mut self, from: NeuronId, towards: NeuronId, weight: f64) -> Option<LinkId> {
        match self.link_policy(from, towards) {
            LinkPolicy::Overwrite(id) => {
                let link = self.links.get_mut(id)?;
                link.weight = weight;
                Some(id)
            }
            LinkPolicy::Reject => None,
            LinkPolicy::Reverse => self.add_link(towards, from, weight),
            LinkPolicy::Insert => {
                let innovation = self.next_innovation();
                let id = self
                    .links
                    .insert(Link::new(innovation, from, towards, weight));
                self.link_order.push(id);
                if let Some(source) = self.neurons.get_mut(from) {
                    source.outgoing.push(id);
                }
                if let Some(target) = self.neurons.get_mut(towards) {
                    target.incoming.push(id);
                }
                trace!("inserted link #{innovation}");
                self.update_layers();
                self.links.contains_key(id).then_some(id)
            }
        }
    }

    /// One above the highest link number in use, or 0 for an empty graph.
    fn next_innovation(&self) -> u32 {
        self.links
            .values()
            .map(|l| l.innovation)
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }

    /// Unhook a link from both endpoints and the link set without relayering.
    fn detach_link(&mut self, id: LinkId) -> Option<Link> {
        let link = self.links.remove(id)?;
        if let Some(source) = self.neurons.get_mut(link.from) {
            source.outgoing.retain(|&l| l != id);
        }
        if let Some(target) = self.neurons.get_mut(link.towards) {
            target.incoming.retain(|&l| l != id);
        }
        self.link_order.retain(|&l| l != id);
        Some(link)
    }

    /// Remove a link and relayer.
    pub fn remove_link(&mut self, id: LinkId) -> Option<Link> {
        let link = self.detach_link(id)?;
        self.update_layers();
        Some(link)
    }

    /// Remove a hidden neuron together with every link touching it.
    ///
    /// This is narrower than a general neuron removal: input and output
    /// neurons are refused, so `in_size`, `out_size` and the output slots stay
    /// fixed for the graph's lifetime and every link keeps a layer on both
    /// ends. `None` is returned for them and for unknown handles.
    pub fn remove_neuron(&mut self, id: NeuronId) -> Option<Neuron> {
        let neuron = self.neurons.get(id)?;
        if neuron.role != Role::Hidden {
            return None;
        }
        let incident: Vec<LinkId> = neuron
            .outgoing
            .iter()
            .chain(&neuron.incoming)
            .copied()
            .collect();
        for link in incident {
            self.detach_link(link);
        }
        let removed = self.neurons.remove(id)?;
        self.neuron_order.retain(|&n| n != id);
        debug!("removed hidden neuron");
        self.update_layers();
        Some(removed)
    }

    /// Insert a hidden neuron in the middle of a link.
    ///
    /// The incoming half keeps the original weight and the outgoing half gets
    /// [`SPLIT_OUTGOING_WEIGHT`]. The original link is removed. Returns the new
    /// neuron, or `None` for an unknown link.
    pub fn split_link(&mut self, id: LinkId) -> Option<NeuronId> {
        let Link {
            from,
            towards,
            weight,
            ..
        } = self.links.get(id)?.clone();

        let mut hidden = Neuron::hidden(0.0);
        hidden.layer = self.neurons.get(from)?.layer.map(|l| l + 1);
        if let Some(target) = self.neurons.get_mut(towards) {
            target.layer = target.layer.map(|l| l + 1);
        }

        let created = self.batch(|g| {
            let created = g.push_neuron(hidden);
            g.add_link(from, created, weight);
            g.add_link(created, towards, SPLIT_OUTGOING_WEIGHT);
            g.detach_link(id);
            created
        });
        debug!(
            "split link into hidden neuron ({} neurons, {} links)",
            self.neuron_count(),
            self.link_count()
        );
        self.neurons.contains_key(created).then_some(created)
    }

    /// Draw every bias and every weight uniformly from `[-1, 1]`.
    pub fn randomize<R: RandomSource + ?Sized>(&mut self, rng: &mut R) {
        for &id in &self.neuron_order {
            if let Some(neuron) = self.neurons.get_mut(id) {
                neuron.bias = rng.unit();
            }
        }
        for &id in &self.link_order {
            if let Some(link) = self.links.get_mut(id) {
                link.weight = rng.unit();
            }
        }
        self.update_layers();
    }

    /// Replace a neuron's bias, returning the previous value.
    pub fn set_bias(&mut self, id: NeuronId, bias: f64) -> Option<f64> {
        let neuron = self.neurons.get_mut(id)?;
        Some(std::mem::replace(&mut neuron.bias, bias))
    }

    /// Replace a link's weight, returning the previous value.
    pub fn set_weight(&mut self, id: LinkId, weight: f64) -> Option<f64> {
        let link = self.links.get_mut(id)?;
        Some(std::mem::replace(&mut link.weight, weight))
    }

    /// Remove links whose endpoints are no longer in the neuron set.
    ///
    /// Returns how many links were dropped.
    pub(crate) fn drop_dangling_links(&mut self) -> usize {
        let dangling: Vec<LinkId> = self
            .links
            .iter()
            .filter(|(_, l)| {
                !self.neurons.contains_key(l.from) || !self.neurons.contains_key(l.towards)
            })
            .map(|(id, _)| id)
            .collect();
        for &id in &dangling {
            self.detach_link(id);
        }
        dangling.len()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Look up a neuron.
    #[must_use]
    pub fn neuron(&self, id: NeuronId) -> Option<&Neuron> {
        self.neurons.get(id)
    }

    /// Look up a link.
    #[must_use]
    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    /// The link from `from` to `towards`, if one exists.
    #[must_use]
    pub fn find_link(&self, from: NeuronId, towards: NeuronId) -> Option<LinkId> {
        let source = self.neurons.get(from)?;
        source
            .outgoing
            .iter()
            .copied()
            .find(|&l| self.links.get(l).is_some_and(|link| link.towards == towards))
    }

    /// Neurons in insertion order.
    pub fn neurons(&self) -> impl Iterator<Item = (NeuronId, &Neuron)> + '_ {
        self.neuron_order
            .iter()
            .filter_map(|&id| self.neurons.get(id).map(|n| (id, n)))
    }

    /// Links in insertion order.
    pub fn links(&self) -> impl Iterator<Item = (LinkId, &Link)> + '_ {
        self.link_order
            .iter()
            .filter_map(|&id| self.links.get(id).map(|l| (id, l)))
    }

    /// Neuron handles in insertion order.
    #[must_use]
    pub fn neuron_ids(&self) -> &[NeuronId] {
        &self.neuron_order
    }

    /// Link handles in insertion order.
    #[must_use]
    pub fn link_ids(&self) -> &[LinkId] {
        &self.link_order
    }

    /// All hidden neurons in insertion order.
    #[must_use]
    pub fn hidden_ids(&self) -> Vec<NeuronId> {
        self.neurons()
            .filter(|(_, n)| n.role == Role::Hidden)
            .map(|(id, _)| id)
            .collect()
    }

    /// Layers from the last settle pass.
    #[must_use]
    pub fn layers(&self) -> &[Vec<NeuronId>] {
        &self.layers
    }

    /// Input neurons in insertion order.
    #[must_use]
    pub fn input_ids(&self) -> &[NeuronId] {
        &self.input_ids
    }

    /// Output neurons in slot order.
    #[must_use]
    pub fn output_ids(&self) -> &[NeuronId] {
        &self.output_ids
    }

    /// Number of values [`evaluate`](crate::evaluator::evaluate) expects.
    #[must_use]
    pub fn in_size(&self) -> usize {
        self.input_ids.len()
    }

    /// Number of values [`evaluate`](crate::evaluator::evaluate) produces.
    #[must_use]
    pub fn out_size(&self) -> usize {
        self.output_ids.len()
    }

    /// Number of neurons.
    #[must_use]
    pub fn neuron_count(&self) -> usize {
        self.neurons.len()
    }

    /// Number of links.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Check the layering invariants of a settled graph.
    ///
    /// Inputs sit in layer 0, outputs in the last layer, and every link points
    /// from a strictly shallower layer to a deeper one.
    #[must_use]
    pub fn is_layer_consistent(&self) -> bool {
        let last = self.layers.len().checked_sub(1);
        let roles_ok = self.neurons.values().all(|n| match n.role {
            Role::Input => n.layer == Some(0),
            Role::Output => n.layer.is_some() && n.layer == last,
            Role::Hidden => n.layer.is_some(),
        });
        let links_ok = self.links.values().all(|l| {
            match (
                self.neurons.get(l.from).and_then(|n| n.layer),
                self.neurons.get(l.towards).and_then(|n| n.layer),
            ) {
                (Some(a), Some(b)) => a < b,
                _ => false,
            }
        });
        roles_ok && links_ok
    }
}

/// Layer used when comparing endpoints for [`LinkPolicy::Reverse`].
fn depth_rank(neuron: &Neuron) -> Option<usize> {
    match neuron.role {
        Role::Input => Some(0),
        Role::Output => Some(usize::MAX),
        Role::Hidden => neuron.layer,
    }
}
