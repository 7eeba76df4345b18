//! Gradient-boosted tree ensemble in the XGBoost JSON dump layout.
//!
//! Each tree is a nested node document:
//!
//! ```json
//! {"nodeid": 0, "split": "tenure", "split_condition": 5.5,
//!  "yes": 1, "no": 2, "missing": 1,
//!  "children": [{"nodeid": 1, "leaf": 0.21}, {"nodeid": 2, "leaf": -0.13}]}
//! ```
//!
//! A row goes to `yes` when `x < split_condition`, to `missing` when `x` is
//! NaN, otherwise to `no`. The churn probability is
//! `sigmoid(logit(base_score) + sum of leaves)`.

use super::{check_features, sigmoid, ChurnModel};
use crate::error::{ChurnError, Result};
use crate::frame::EncodedFrame;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_base_score() -> f64 {
    0.5
}

/// One node as it appears in the dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpNode {
    pub nodeid: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_condition: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yes: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DumpNode>,
}

impl DumpNode {
    pub fn leaf(nodeid: usize, value: f64) -> Self {
        Self {
            nodeid,
            split: None,
            split_condition: None,
            yes: None,
            no: None,
            missing: None,
            leaf: Some(value),
            children: Vec::new(),
        }
    }

    /// Split node; missing values follow the `yes` branch.
    pub fn split(
        nodeid: usize,
        feature: impl Into<String>,
        threshold: f64,
        yes: DumpNode,
        no: DumpNode,
    ) -> Self {
        Self {
            nodeid,
            split: Some(feature.into()),
            split_condition: Some(threshold),
            yes: Some(yes.nodeid),
            no: Some(no.nodeid),
            missing: Some(yes.nodeid),
            leaf: None,
            children: vec![yes, no],
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        yes: usize,
        no: usize,
        missing: usize,
    },
}

/// Flattened tree, nodes indexed by arena position.
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn compile(root: &DumpNode, features: &HashMap<&str, usize>) -> Result<Self> {
        let mut by_id: HashMap<usize, &DumpNode> = HashMap::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if by_id.insert(node.nodeid, node).is_some() {
                return Err(invalid(format!("duplicate nodeid {}", node.nodeid)));
            }
            stack.extend(node.children.iter());
        }

        // arena slot per nodeid, root first
        let mut slots: HashMap<usize, usize> = HashMap::new();
        let mut order = vec![root.nodeid];
        slots.insert(root.nodeid, 0);
        let mut nodes = Vec::with_capacity(by_id.len());
        let mut next = 0;

        while next < order.len() {
            let dump = by_id[&order[next]];
            next += 1;

            if let Some(value) = dump.leaf {
                if !value.is_finite() {
                    return Err(invalid(format!("node {} has a non-finite leaf", dump.nodeid)));
                }
                nodes.push(Node::Leaf(value));
                continue;
            }

            let name = dump
                .split
                .as_deref()
                .ok_or_else(|| invalid(format!("node {} is neither leaf nor split", dump.nodeid)))?;
            let feature = *features
                .get(name)
                .ok_or_else(|| invalid(format!("node {} splits on unknown feature {}", dump.nodeid, name)))?;
            let threshold = dump
                .split_condition
                .ok_or_else(|| invalid(format!("node {} has no split_condition", dump.nodeid)))?;
            let (yes, no) = match (dump.yes, dump.no) {
                (Some(yes), Some(no)) => (yes, no),
                _ => return Err(invalid(format!("node {} is missing a branch", dump.nodeid))),
            };
            let missing = dump.missing.unwrap_or(yes);

            let mut slot_of = |id: usize| -> Result<usize> {
                if !by_id.contains_key(&id) {
                    return Err(invalid(format!("node {} points at absent node {}", dump.nodeid, id)));
                }
                Ok(*slots.entry(id).or_insert_with(|| {
                    order.push(id);
                    order.len() - 1
                }))
            };
            let yes = slot_of(yes)?;
            let no = slot_of(no)?;
            let missing = slot_of(missing)?;

            // children must come after their parent, which rules out cycles
            let here = nodes.len();
            if yes <= here || no <= here || missing <= here {
                return Err(invalid(format!("node {} branches backwards", dump.nodeid)));
            }

            nodes.push(Node::Split {
                feature,
                threshold,
                yes,
                no,
                missing,
            });
        }

        Ok(Self { nodes })
    }

    fn score(&self, row: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match self.nodes[at] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                    missing,
                } => {
                    let x = row[feature];
                    at = if x.is_nan() {
                        missing
                    } else if x < threshold {
                        yes
                    } else {
                        no
                    };
                }
            }
        }
    }
}

fn invalid(message: String) -> ChurnError {
    ChurnError::ModelLoad(format!("tree ensemble: {}", message))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsembleModel {
    pub features: Vec<String>,
    /// Global prior as a probability, as in XGBoost's `base_score`
    #[serde(default = "default_base_score")]
    pub base_score: f64,
    pub trees: Vec<DumpNode>,
    #[serde(skip)]
    compiled: Vec<Tree>,
}

impl TreeEnsembleModel {
    pub fn new(features: Vec<String>, base_score: f64, trees: Vec<DumpNode>) -> Result<Self> {
        let mut model = Self {
            features,
            base_score,
            trees,
            compiled: Vec::new(),
        };
        model.validate()?;
        Ok(model)
    }

    /// Check the dump and build the flattened trees.
    pub(crate) fn validate(&mut self) -> Result<()> {
        if self.features.is_empty() {
            return Err(invalid("no features".into()));
        }
        if self.trees.is_empty() {
            return Err(invalid("no trees".into()));
        }
        if !(self.base_score > 0.0 && self.base_score < 1.0) {
            return Err(invalid(format!("base_score {} outside (0, 1)", self.base_score)));
        }

        let positions: HashMap<&str, usize> = self
            .features
            .iter()
            .enumerate()
            .map(|(i, f)| (f.as_str(), i))
            .collect();
        self.compiled = self
            .trees
            .iter()
            .map(|root| Tree::compile(root, &positions))
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    fn base_margin(&self) -> f64 {
        (self.base_score / (1.0 - self.base_score)).ln()
    }
}

impl ChurnModel for TreeEnsembleModel {
    fn features(&self) -> &[String] {
        &self.features
    }

    fn predict_proba(&self, frame: &EncodedFrame) -> Result<Vec<[f64; 2]>> {
        check_features(&self.features, frame)?;
        let base = self.base_margin();
        Ok(frame
            .rows()
            .iter()
            .map(|row| {
                let margin = base + self.compiled.iter().map(|t| t.score(row)).sum::<f64>();
                let p = sigmoid(margin);
                [1.0 - p, p]
            })
            .collect())
    }

    fn describe(&self) -> String {
        format!(
            "tree ensemble with {} trees over {} features",
            self.compiled.len(),
            self.features.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn frame(rows: Vec<Vec<f64>>) -> EncodedFrame {
        let columns: Arc<[String]> = names(&["tenure", "Contract"]).into();
        EncodedFrame::new(columns, rows).unwrap()
    }

    fn stump() -> DumpNode {
        DumpNode::split(
            0,
            "tenure",
            12.0,
            DumpNode::leaf(1, 1.0),
            DumpNode::leaf(2, -1.0),
        )
    }

    #[test]
    fn test_stump_routes_on_threshold() {
        let model = TreeEnsembleModel::new(names(&["tenure", "Contract"]), 0.5, vec![stump()]).unwrap();
        let probs = model
            .predict_proba(&frame(vec![vec![3.0, 0.0], vec![12.0, 0.0], vec![f64::NAN, 0.0]]))
            .unwrap();

        assert!((probs[0][1] - sigmoid(1.0)).abs() < 1e-12);
        // equal to threshold goes right
        assert!((probs[1][1] - sigmoid(-1.0)).abs() < 1e-12);
        // missing follows the yes branch
        assert!((probs[2][1] - sigmoid(1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_trees_sum_with_base_score() {
        let second = DumpNode::split(
            0,
            "Contract",
            1.5,
            DumpNode::leaf(1, 0.5),
            DumpNode::leaf(2, -2.0),
        );
        let model =
            TreeEnsembleModel::new(names(&["tenure", "Contract"]), 0.25, vec![stump(), second]).unwrap();
        let probs = model.predict_proba(&frame(vec![vec![24.0, 2.0]])).unwrap();
        let expected = sigmoid((0.25f64 / 0.75).ln() - 1.0 - 2.0);
        assert!((probs[0][1] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_parses_xgboost_dump() {
        let json = r#"{
            "format": "tree_ensemble",
            "features": ["tenure", "Contract"],
            "trees": [{
                "nodeid": 0, "depth": 0, "split": "Contract", "split_condition": 0.5,
                "yes": 1, "no": 2, "missing": 1,
                "children": [
                    {"nodeid": 1, "leaf": 0.4},
                    {"nodeid": 2, "leaf": -0.6}
                ]
            }]
        }"#;
        let model = crate::model::model_from_json(json).unwrap();
        let probs = model.predict_proba(&frame(vec![vec![1.0, 0.0]])).unwrap();
        assert!((probs[0][1] - sigmoid(0.4)).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_unknown_split_feature() {
        let tree = DumpNode::split(0, "gender", 0.5, DumpNode::leaf(1, 0.1), DumpNode::leaf(2, 0.2));
        assert!(TreeEnsembleModel::new(names(&["tenure"]), 0.5, vec![tree]).is_err());
    }

    #[test]
    fn test_rejects_dangling_and_cyclic_references() {
        let mut dangling = stump();
        dangling.no = Some(7);
        assert!(TreeEnsembleModel::new(names(&["tenure"]), 0.5, vec![dangling]).is_err());

        let mut cyclic = stump();
        cyclic.yes = Some(0);
        assert!(TreeEnsembleModel::new(names(&["tenure"]), 0.5, vec![cyclic]).is_err());
    }

    #[test]
    fn test_rejects_bad_base_score() {
        assert!(TreeEnsembleModel::new(names(&["tenure"]), 1.0, vec![stump()]).is_err());
    }
}
