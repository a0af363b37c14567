//! Client-side mirror of the server's world
//!
//! Entities live in an arena and are addressed by stable [`EntityHandle`]s.
//! Nothing is ever removed: an identity that disappears from later snapshots
//! keeps its last mirrored position, matching the server's lack of despawn.

use std::collections::BTreeMap;

use crate::ws::protocol::{Game, Identity, Position};

/// Something the renderer can place in the world
pub trait Placeable {
    fn set_position(&mut self, position: Position);
    fn position(&self) -> Position;
}

/// Stable index into the mirror's entity arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(usize);

/// What a snapshot did to the mirror
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub spawned: Vec<Identity>,
    pub updated: usize,
}

/// Identity -> entity cache reconciled against each snapshot
#[derive(Debug)]
pub struct ClientMirror<E> {
    template: E,
    entities: Vec<E>,
    handles: BTreeMap<Identity, EntityHandle>,
}

impl<E: Placeable + Clone> ClientMirror<E> {
    /// New entities are clones of `template`
    pub fn new(template: E) -> Self {
        Self {
            template,
            entities: Vec::new(),
            handles: BTreeMap::new(),
        }
    }

    /// Bring the mirror in line with a snapshot
    pub fn reconcile(&mut self, game: &Game) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for (&id, &position) in &game.positions {
            match self.handles.get(&id) {
                Some(&EntityHandle(index)) => {
                    self.entities[index].set_position(position);
                    report.updated += 1;
                }
                None => {
                    let mut entity = self.template.clone();
                    entity.set_position(position);
                    self.handles.insert(id, EntityHandle(self.entities.len()));
                    self.entities.push(entity);
                    report.spawned.push(id);
                }
            }
        }

        report
    }

    pub fn handle(&self, id: Identity) -> Option<EntityHandle> {
        self.handles.get(&id).copied()
    }

    pub fn entity(&self, handle: EntityHandle) -> Option<&E> {
        self.entities.get(handle.0)
    }

    pub fn entity_for(&self, id: Identity) -> Option<&E> {
        self.handle(id).and_then(|h| self.entity(h))
    }

    pub fn position_of(&self, id: Identity) -> Option<Position> {
        self.entity_for(id).map(Placeable::position)
    }

    /// Mirrored entities in identity order
    pub fn iter(&self) -> impl Iterator<Item = (Identity, &E)> + '_ {
        self.handles
            .iter()
            .map(move |(&id, &EntityHandle(index))| (id, &self.entities[index]))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Marker {
        label: &'static str,
        at: Position,
    }

    impl Placeable for Marker {
        fn set_position(&mut self, position: Position) {
            self.at = position;
        }

        fn position(&self) -> Position {
            self.at
        }
    }

    fn template() -> Marker {
        Marker {
            label: "monkey",
            at: Position::default(),
        }
    }

    fn game(entries: &[(Identity, Position)]) -> Game {
        Game {
            positions: entries.iter().copied().collect(),
        }
    }

    #[test]
    fn new_identities_are_cloned_from_template() {
        let mut mirror = ClientMirror::new(template());
        let report = mirror.reconcile(&game(&[
            (1, Position::new(1.0, 0.0, 0.0)),
            (2, Position::new(2.0, 0.0, 0.0)),
        ]));

        assert_eq!(report.spawned, vec![1, 2]);
        assert_eq!(report.updated, 0);
        assert_eq!(mirror.len(), 2);
        let entity = mirror.entity_for(2).unwrap();
        assert_eq!(entity.label, "monkey");
        assert_eq!(entity.at, Position::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn known_identities_update_in_place() {
        let mut mirror = ClientMirror::new(template());
        mirror.reconcile(&game(&[(1, Position::new(1.0, 0.0, 0.0))]));
        let handle = mirror.handle(1).unwrap();

        let report = mirror.reconcile(&game(&[(1, Position::new(1.0, 0.0, -0.1))]));

        assert!(report.spawned.is_empty());
        assert_eq!(report.updated, 1);
        assert_eq!(mirror.handle(1), Some(handle));
        assert_eq!(mirror.position_of(1), Some(Position::new(1.0, 0.0, -0.1)));
        assert_eq!(mirror.len(), 1);
    }

    #[test]
    fn missing_identities_are_kept() {
        let mut mirror = ClientMirror::new(template());
        mirror.reconcile(&game(&[
            (1, Position::new(1.0, 0.0, 0.0)),
            (2, Position::new(2.0, 0.0, 0.0)),
        ]));
        mirror.reconcile(&game(&[(2, Position::new(2.5, 0.0, 0.0))]));

        assert_eq!(mirror.len(), 2);
        assert_eq!(mirror.position_of(1), Some(Position::new(1.0, 0.0, 0.0)));
        assert_eq!(mirror.position_of(2), Some(Position::new(2.5, 0.0, 0.0)));
    }

    #[test]
    fn template_is_not_mutated() {
        let mut mirror = ClientMirror::new(template());
        mirror.reconcile(&game(&[(5, Position::new(5.0, 1.0, 1.0))]));
        assert_eq!(mirror.template, template());

        let ids: Vec<Identity> = mirror.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![5]);
    }
}
