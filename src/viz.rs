/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2026 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! GraphViz `dot` pretty-printer, driven by [`Tree::walk`].

use std::io::Write;

use crate::field::Hash;
use crate::node::Node;
use crate::storage::CancelToken;
use crate::tree::Tree;

/// Write a `digraph` to `w`: one node per stored `Leaf`/`Middle` reached
/// from `root_key` (or the tree's current root), edges for `Middle.L` /
/// `Middle.R`, leaves rendered as `record` shapes showing `k`/`v` in hex.
pub async fn graphviz<W: Write>(
    tree: &Tree,
    ctx: &CancelToken,
    root_key: Option<Hash>,
    w: &mut W,
) -> crate::error::Result<()> {
    writeln!(w, "digraph smt {{")?;

    let root = match root_key {
        Some(r) => r,
        None => tree.root().await,
    };

    if root.is_zero() {
        writeln!(w, "  empty [label=\"(empty tree)\"];")?;
        writeln!(w, "}}")?;
        return Ok(())
    }

    let mut lines = Vec::new();
    tree.walk(ctx, Some(root), |key, node| match node {
        Node::Leaf { k, v } => {
            lines.push(format!(
                "  \"{key}\" [shape=record, label=\"{{Leaf|k: {}|v: {}}}\"];",
                short_hex(&k),
                short_hex(&v)
            ));
        }
        Node::Middle { l, r } => {
            lines.push(format!("  \"{key}\" [shape=circle, label=\"M\"];"));
            lines.push(format!("  \"{key}\" -> \"{l}\" [label=\"L\"];"));
            lines.push(format!("  \"{key}\" -> \"{r}\" [label=\"R\"];"));
        }
        Node::Empty => {}
    })
    .await?;

    for line in lines {
        writeln!(w, "{line}")?;
    }

    writeln!(w, "}}")?;
    Ok(())
}

fn short_hex(h: &Hash) -> String {
    let hex = h.to_hex();
    format!("0x{}…{}", &hex[..6], &hex[hex.len() - 6..])
}

/// Render the graph to a freshly-allocated `String` instead of an
/// arbitrary writer.
pub async fn graphviz_string(
    tree: &Tree,
    ctx: &CancelToken,
    root_key: Option<Hash>,
) -> crate::error::Result<String> {
    let mut buf = Vec::new();
    graphviz(tree, ctx, root_key, &mut buf).await?;
    Ok(String::from_utf8(buf).expect("dot output is always valid UTF-8"))
}
