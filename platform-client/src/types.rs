use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryNode {
    pub id: i64,
    pub name: String,
    #[serde(default, rename = "children")]
    pub children: Vec<CategoryNode>,
}

/// Flattened category node produced by a DFS walk of the tree, carrying the
/// parent's external id so the caller can upsert in two passes.
#[derive(Debug, Clone)]
pub struct FlatCategory {
    pub external_id: i64,
    pub name: String,
    pub parent_external_id: Option<i64>,
}

pub fn flatten_tree(nodes: &[CategoryNode]) -> Vec<FlatCategory> {
    let mut out = Vec::new();
    for node in nodes {
        flatten_node(node, None, &mut out);
    }
    out
}

fn flatten_node(node: &CategoryNode, parent_external_id: Option<i64>, out: &mut Vec<FlatCategory>) {
    out.push(FlatCategory {
        external_id: node.id,
        name: node.name.clone(),
        parent_external_id,
    });
    for child in &node.children {
        flatten_node(child, Some(node.id), out);
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PickupPointCandidate {
    pub id: String,
    pub name: String,
    #[serde(rename = "geoCoordinates", default)]
    pub geo_coordinates: Vec<f64>,
}

impl PickupPointCandidate {
    /// `geoCoordinates` is `[lon, lat]`; returns `None` if the platform sent
    /// a malformed pair.
    pub fn lon_lat(&self) -> Option<(f64, f64)> {
        match self.geo_coordinates.as_slice() {
            [lon, lat] => Some((*lon, *lat)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionSeller {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_dfs_preserving_parent_ids() {
        let tree = vec![CategoryNode {
            id: 1,
            name: "root".into(),
            children: vec![
                CategoryNode { id: 2, name: "a".into(), children: vec![] },
                CategoryNode { id: 3, name: "b".into(), children: vec![] },
            ],
        }];
        let flat = flatten_tree(&tree);
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[0].parent_external_id, None);
        assert_eq!(flat[1].parent_external_id, Some(1));
        assert_eq!(flat[2].parent_external_id, Some(1));
    }

    #[test]
    fn lon_lat_requires_exactly_two_coordinates() {
        let candidate = PickupPointCandidate { id: "pp-1".into(), name: "x".into(), geo_coordinates: vec![-58.38, -34.60] };
        assert_eq!(candidate.lon_lat(), Some((-58.38, -34.60)));
        let bad = PickupPointCandidate { id: "pp-2".into(), name: "x".into(), geo_coordinates: vec![] };
        assert_eq!(bad.lon_lat(), None);
    }
}
