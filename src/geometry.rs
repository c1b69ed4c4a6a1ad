//! The geometry module: interned surfaces, cells, and the universe tree.
//!
//! Everything is stored in flat vectors frozen at setup; all cross links are
//! indices into those vectors. User ids map to internal ids through
//! insertion-ordered indexes so setup is deterministic.

use crate::cell::{Cell, SenseEntry};
use crate::definitions::{
    parse_signed_surface, CellDefinition, LatticeDefinition, ObjectDefinition,
    GEOMETRY_MODULE, MATERIALS_MODULE,
};
use crate::error::{HeliosError, Result};
use crate::material::MaterialsModule;
use crate::surface::Surface;
use crate::universe::{Lattice, Universe, ROOT_UNIVERSE_ID};
use indexmap::IndexMap;
use nalgebra::Vector3;
use rand::Rng;

/// The assembled geometry.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    /// All surfaces, indexed by internal id.
    pub surfaces: Vec<Surface>,
    /// All cells, indexed by internal id.
    pub cells: Vec<Cell>,
    /// All universes, indexed by internal id.
    pub universes: Vec<Universe>,
    /// Internal id of the root universe.
    pub root: usize,
    surface_index: IndexMap<String, usize>,
    cell_index: IndexMap<String, usize>,
    universe_index: IndexMap<String, usize>,
}

impl Geometry {
    /// Assemble the geometry from its staged definitions.
    ///
    /// Surfaces are interned first, then lattices, then cells, so every
    /// cross reference resolves in one pass over each kind. Cells referencing
    /// materials need the materials module to already be set up.
    pub fn from_definitions(
        definitions: &[ObjectDefinition],
        materials: Option<&MaterialsModule>,
    ) -> Result<Self> {
        let mut geometry = Geometry::default();
        for definition in definitions {
            if let ObjectDefinition::Surface(def) = definition {
                geometry.intern_surface(Surface::from_tag(
                    &def.user_id,
                    &def.tag,
                    &def.coefficients,
                    def.boundary,
                )?)?;
            }
        }
        for definition in definitions {
            if let ObjectDefinition::Lattice(def) = definition {
                geometry.intern_lattice(def)?;
            }
        }
        for definition in definitions {
            if let ObjectDefinition::Cell(def) = definition {
                geometry.intern_cell(def, materials)?;
            }
        }
        geometry.link_parents();
        geometry.root = geometry.universe(ROOT_UNIVERSE_ID).ok_or_else(|| {
            HeliosError::ObjectMissing {
                module: GEOMETRY_MODULE.to_string(),
                user_id: ROOT_UNIVERSE_ID.to_string(),
            }
        })?;
        geometry.check_acyclic()?;
        for universe in &geometry.universes {
            if universe.cells.is_empty() && universe.lattice.is_none() {
                tracing::warn!(
                    "universe '{}' is referenced but holds no cells",
                    universe.user_id
                );
            }
        }
        Ok(geometry)
    }

    fn intern_surface(&mut self, mut surface: Surface) -> Result<usize> {
        if self.surface_index.contains_key(&surface.user_id) {
            return Err(HeliosError::BadSurfaceCreation {
                user_id: surface.user_id,
                reason: "duplicate surface user id".to_string(),
            });
        }
        let index = self.surfaces.len();
        surface.index = index;
        self.surface_index.insert(surface.user_id.clone(), index);
        self.surfaces.push(surface);
        Ok(index)
    }

    /// Intern a universe user id, creating an empty universe on first sight.
    fn universe_or_intern(&mut self, user_id: &str) -> usize {
        if let Some(&index) = self.universe_index.get(user_id) {
            return index;
        }
        let index = self.universes.len();
        let mut universe = Universe::new(user_id);
        universe.index = index;
        self.universe_index.insert(user_id.to_string(), index);
        self.universes.push(universe);
        index
    }

    fn intern_lattice(&mut self, def: &LatticeDefinition) -> Result<()> {
        let slots: Vec<usize> = def
            .slots
            .iter()
            .map(|slot| self.universe_or_intern(slot))
            .collect();
        let lattice = Lattice::try_new(
            &def.user_id,
            def.shape,
            Vector3::from(def.pitch),
            Vector3::from(def.origin),
            def.kind,
            slots,
        )?;
        let universe = self.universe_or_intern(&def.user_id);
        if self.universes[universe].lattice.is_some() {
            return Err(HeliosError::ParseError {
                path: def.user_id.clone(),
                reason: "duplicate lattice user id".to_string(),
            });
        }
        self.universes[universe].lattice = Some(lattice);
        Ok(())
    }

    fn intern_cell(
        &mut self,
        def: &CellDefinition,
        materials: Option<&MaterialsModule>,
    ) -> Result<()> {
        if self.cell_index.contains_key(&def.user_id) {
            return Err(HeliosError::ParseError {
                path: def.user_id.clone(),
                reason: "duplicate cell user id".to_string(),
            });
        }
        let mut senses = Vec::with_capacity(def.surfaces.len());
        for reference in &def.surfaces {
            let (surface_id, sense) = parse_signed_surface(reference);
            let surface = self.surface(surface_id).ok_or_else(|| {
                HeliosError::ObjectMissing {
                    module: GEOMETRY_MODULE.to_string(),
                    user_id: surface_id.to_string(),
                }
            })?;
            senses.push(SenseEntry { surface, sense });
        }
        let material = match &def.material {
            Some(material_id) => Some(
                materials
                    .and_then(|module| module.material(material_id))
                    .ok_or_else(|| HeliosError::ObjectMissing {
                        module: MATERIALS_MODULE.to_string(),
                        user_id: material_id.clone(),
                    })?,
            ),
            None => None,
        };
        let fill = def
            .fill
            .as_ref()
            .map(|fill_id| self.universe_or_intern(fill_id));
        let mut cell = Cell::try_new(&def.user_id, senses, material, fill)?;
        if let Some(translation) = def.fill_translation {
            cell.fill_translation = Vector3::from(translation);
        }
        let index = self.cells.len();
        cell.index = index;
        self.cell_index.insert(def.user_id.clone(), index);
        let universe = self.universe_or_intern(&def.universe);
        self.universes[universe].cells.push(index);
        self.cells.push(cell);
        Ok(())
    }

    /// Record the parent fill cell on each filled universe (first fill wins
    /// when a universe is shared between several cells).
    fn link_parents(&mut self) {
        for cell_index in 0..self.cells.len() {
            if let Some(universe) = self.cells[cell_index].fill() {
                if self.universes[universe].parent_cell.is_none() {
                    self.universes[universe].parent_cell = Some(cell_index);
                }
            }
        }
    }

    /// The directed graph of fill and lattice-slot edges must be a tree.
    fn check_acyclic(&self) -> Result<()> {
        // 0 = untouched, 1 = on the current path, 2 = done
        let mut marks = vec![0_u8; self.universes.len()];
        let mut stack = vec![(self.root, false)];
        while let Some((universe, leaving)) = stack.pop() {
            if leaving {
                marks[universe] = 2;
                continue;
            }
            match marks[universe] {
                1 => {
                    return Err(HeliosError::ParseError {
                        path: self.universes[universe].user_id.clone(),
                        reason: "universe fill graph has a cycle".to_string(),
                    });
                }
                2 => continue,
                _ => {}
            }
            marks[universe] = 1;
            stack.push((universe, true));
            for &cell in &self.universes[universe].cells {
                if let Some(child) = self.cells[cell].fill() {
                    if marks[child] == 1 {
                        return Err(HeliosError::ParseError {
                            path: self.universes[child].user_id.clone(),
                            reason: "universe fill graph has a cycle".to_string(),
                        });
                    }
                    if marks[child] == 0 {
                        stack.push((child, false));
                    }
                }
            }
            if let Some(lattice) = &self.universes[universe].lattice {
                for &slot in &lattice.slots {
                    if marks[slot] == 1 {
                        return Err(HeliosError::ParseError {
                            path: self.universes[slot].user_id.clone(),
                            reason: "universe fill graph has a cycle".to_string(),
                        });
                    }
                    if marks[slot] == 0 {
                        stack.push((slot, false));
                    }
                }
            }
        }
        Ok(())
    }

    /// Surface internal id by user id.
    pub fn surface(&self, user_id: &str) -> Option<usize> {
        self.surface_index.get(user_id).copied()
    }

    /// Cell internal id by user id.
    pub fn cell(&self, user_id: &str) -> Option<usize> {
        self.cell_index.get(user_id).copied()
    }

    /// Universe internal id by user id.
    pub fn universe(&self, user_id: &str) -> Option<usize> {
        self.universe_index.get(user_id).copied()
    }

    /// Find the cell of `universe` containing `point`, reporting an overlap
    /// if more than one cell claims it.
    pub fn find_cell_checked(
        &self,
        universe: usize,
        point: &Vector3<f64>,
    ) -> Result<Option<usize>> {
        let mut found: Option<usize> = None;
        for &cell in &self.universes[universe].cells {
            if self.cells[cell].contains(point, &self.surfaces) {
                if let Some(previous) = found {
                    return Err(HeliosError::OverlappingCells {
                        cell_a: self.cells[previous].user_id.clone(),
                        cell_b: self.cells[cell].user_id.clone(),
                        x: point.x,
                        y: point.y,
                        z: point.z,
                    });
                }
                found = Some(cell);
            }
        }
        Ok(found)
    }

    /// Consistency sweep: sample points uniformly in a box and fail on the
    /// first one claimed by two cells of the same universe.
    pub fn overlap_sweep<R: Rng>(
        &self,
        universe: usize,
        lower: &Vector3<f64>,
        upper: &Vector3<f64>,
        samples: usize,
        rng: &mut R,
    ) -> Result<()> {
        for _ in 0..samples {
            let point = Vector3::new(
                lower.x + rng.gen::<f64>() * (upper.x - lower.x),
                lower.y + rng.gen::<f64>() * (upper.y - lower.y),
                lower.z + rng.gen::<f64>() * (upper.z - lower.z),
            );
            self.find_cell_checked(universe, &point)?;
        }
        Ok(())
    }
}
