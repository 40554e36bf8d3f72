// SPDX-License-Identifier: GPL-2.0

//! Acyclicity check and topological ordering
//!
//! The single enforcement point for the no-loops rule: a depth-first
//! traversal from the entry block keeps an on-stack marker, and any edge
//! into a block still on the traversal stack is a back edge and a
//! categorical rejection. Because the surviving graph is acyclic, the
//! reversed postorder is a topological ordering and the interpreter can
//! visit every reachable block exactly once, predecessors first.

use crate::analysis::cfg::ControlFlowGraph;
use crate::core::error::{Result, VerifierError};
use crate::stdlib::{vec, Vec};

const UNVISITED: u8 = 0;
const ON_STACK: u8 = 1;
const DONE: u8 = 2;

/// Prove the graph acyclic and produce a topological ordering of the
/// blocks reachable from the entry
///
/// Fails with [`VerifierError::CyclicControlFlow`] carrying the
/// instruction indices of the back edge's source terminator and its target
/// block start.
pub fn topo_order(cfg: &ControlFlowGraph) -> Result<Vec<usize>> {
    let mut color = vec![UNVISITED; cfg.len()];
    let mut postorder = Vec::with_capacity(cfg.len());

    // Iterative DFS; each frame remembers which successor to try next
    let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
    color[0] = ON_STACK;

    'walk: while let Some((block, next_succ)) = stack.pop() {
        let succs = cfg.block(block).successors();

        let mut i = next_succ;
        while i < succs.len() {
            let succ_slot = succs[i];
            i += 1;
            let Some(succ) = succ_slot else { continue };

            match color[succ] {
                ON_STACK => {
                    return Err(VerifierError::CyclicControlFlow {
                        from: cfg.block(block).end,
                        to: cfg.block(succ).start,
                    });
                }
                UNVISITED => {
                    // Come back to the remaining successors after the child
                    stack.push((block, i));
                    color[succ] = ON_STACK;
                    stack.push((succ, 0));
                    continue 'walk;
                }
                _ => {}
            }
        }

        color[block] = DONE;
        postorder.push(block);
    }

    postorder.reverse();
    Ok(postorder)
}
