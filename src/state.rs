use std::fmt;
use std::ops::{Index, IndexMut};

use crate::config::ParamTree;
use crate::error::ConfigError;

/// Flat offset of `(col, row)` in a row-major field with `cols` columns.
#[inline(always)]
pub const fn idx_inner(col: usize, row: usize, cols: usize) -> usize {
    row * cols + col
}

/// Cell counts of the domain: `m` rows by `n` columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dims {
    pub m: usize,
    pub n: usize,
}

impl Dims {
    pub const fn new(m: usize, n: usize) -> Self {
        Self { m, n }
    }

    /// Interior vertical faces, `(n-1)` columns by `m` rows.
    pub const fn u_len(&self) -> usize {
        self.m * (self.n - 1)
    }

    /// Interior horizontal faces, `n` columns by `(m-1)` rows.
    pub const fn v_len(&self) -> usize {
        (self.m - 1) * self.n
    }

    pub const fn cell_len(&self) -> usize {
        self.m * self.n
    }

    /// Length of the combined `[u; v; p]` vector.
    pub const fn stokes_len(&self) -> usize {
        self.u_len() + self.v_len() + self.cell_len()
    }

    /// Length of the combined `[uF; vF]` vector.
    pub const fn forcing_len(&self) -> usize {
        self.u_len() + self.v_len()
    }

    /// Length of the combined `[uB; vB]` wall-velocity vector.
    pub const fn velocity_boundary_len(&self) -> usize {
        2 * self.m + 2 * self.n
    }

    pub const fn node_len(&self) -> usize {
        (self.m + 1) * (self.n + 1)
    }
}

/// Read-only `(column, row)` window over a flat buffer.
#[derive(Clone, Copy)]
pub struct FieldView<'a> {
    data: &'a [f64],
    cols: usize,
    rows: usize,
}

impl<'a> FieldView<'a> {
    pub fn new(data: &'a [f64], cols: usize, rows: usize) -> Self {
        debug_assert_eq!(data.len(), cols * rows, "buffer does not match {}x{} window", cols, rows);
        Self { data, cols, rows }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn at(&self, col: usize, row: usize) -> f64 {
        debug_assert!(col < self.cols, "column {} out of range ({})", col, self.cols);
        self.data[idx_inner(col, row, self.cols)]
    }

    pub fn as_slice(&self) -> &'a [f64] {
        self.data
    }

    /// Largest absolute value, 0 for an empty field.
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }
}

impl Index<(usize, usize)> for FieldView<'_> {
    type Output = f64;

    fn index(&self, (col, row): (usize, usize)) -> &f64 {
        debug_assert!(col < self.cols, "column {} out of range ({})", col, self.cols);
        &self.data[idx_inner(col, row, self.cols)]
    }
}

/// Rows are printed top (last row) first, matching the physical layout.
impl fmt::Display for FieldView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..self.rows).rev() {
            for col in 0..self.cols {
                if col > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{:>12.5e}", self.at(col, row))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Mutable `(column, row)` window over a flat buffer.
pub struct FieldViewMut<'a> {
    data: &'a mut [f64],
    cols: usize,
    rows: usize,
}

impl<'a> FieldViewMut<'a> {
    pub fn new(data: &'a mut [f64], cols: usize, rows: usize) -> Self {
        debug_assert_eq!(data.len(), cols * rows, "buffer does not match {}x{} window", cols, rows);
        Self { data, cols, rows }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn at(&self, col: usize, row: usize) -> f64 {
        debug_assert!(col < self.cols, "column {} out of range ({})", col, self.cols);
        self.data[idx_inner(col, row, self.cols)]
    }

    #[inline]
    pub fn set(&mut self, col: usize, row: usize, value: f64) {
        debug_assert!(col < self.cols, "column {} out of range ({})", col, self.cols);
        self.data[idx_inner(col, row, self.cols)] = value;
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[f64] {
        self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.data
    }

    pub fn as_view(&self) -> FieldView<'_> {
        FieldView::new(self.data, self.cols, self.rows)
    }
}

impl Index<(usize, usize)> for FieldViewMut<'_> {
    type Output = f64;

    fn index(&self, (col, row): (usize, usize)) -> &f64 {
        debug_assert!(col < self.cols, "column {} out of range ({})", col, self.cols);
        &self.data[idx_inner(col, row, self.cols)]
    }
}

impl IndexMut<(usize, usize)> for FieldViewMut<'_> {
    fn index_mut(&mut self, (col, row): (usize, usize)) -> &mut f64 {
        debug_assert!(col < self.cols, "column {} out of range ({})", col, self.cols);
        &mut self.data[idx_inner(col, row, self.cols)]
    }
}

/// Face velocities including the prescribed wall values.
#[derive(Clone, Copy)]
pub struct VelocityFields<'a> {
    pub u: FieldView<'a>,
    pub v: FieldView<'a>,
    /// Column 0: left wall, column 1: right wall.
    pub u_boundary: FieldView<'a>,
    /// Row 0: bottom wall, row 1: top wall.
    pub v_boundary: FieldView<'a>,
}

/// Fields touched by the advection-diffusion step.
pub struct TransportFields<'a> {
    pub velocity: VelocityFields<'a>,
    pub temperature: FieldViewMut<'a>,
    /// Row 0: lower wall, row 1: upper wall.
    pub temperature_boundary: FieldView<'a>,
}

/// Fields touched by the Stokes solve.
pub struct StokesFields<'a> {
    /// `[u; v; p]`
    pub solution: &'a mut [f64],
    /// `[uF; vF]`
    pub forcing: &'a [f64],
    /// `[uB; vB]`
    pub velocity_boundary: &'a [f64],
    pub viscosity: FieldView<'a>,
}

/// Owner of every grid buffer for the lifetime of a run.
///
/// Buffers are zero-filled on construction and never resized.
pub struct GridState {
    dims: Dims,
    stokes: Vec<f64>,
    forcing: Vec<f64>,
    velocity_boundary: Vec<f64>,
    temperature: Vec<f64>,
    temperature_boundary: Vec<f64>,
    viscosity: Vec<f64>,
}

impl GridState {
    pub fn new(dims: Dims) -> Self {
        assert!(dims.m >= 2 && dims.n >= 2, "grid must be at least 2x2, got {}x{}", dims.m, dims.n);
        Self {
            dims,
            stokes: vec![0.0; dims.stokes_len()],
            forcing: vec![0.0; dims.forcing_len()],
            velocity_boundary: vec![0.0; dims.velocity_boundary_len()],
            temperature: vec![0.0; dims.cell_len()],
            temperature_boundary: vec![0.0; 2 * dims.n],
            viscosity: vec![0.0; dims.node_len()],
        }
    }

    /// Build from `geometryParams.M` / `geometryParams.N`.
    pub fn from_params(tree: &ParamTree) -> Result<Self, ConfigError> {
        let geometry = tree.section("geometryParams")?;
        let m: usize = geometry.get("M")?;
        let n: usize = geometry.get("N")?;
        for (key, value) in [("M", m), ("N", n)] {
            if value < 2 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "grid needs at least 2 cells in each direction".to_string(),
                });
            }
        }
        Ok(Self::new(Dims::new(m, n)))
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    fn stokes_split(&self) -> (&[f64], &[f64], &[f64]) {
        let (u, rest) = self.stokes.split_at(self.dims.u_len());
        let (v, p) = rest.split_at(self.dims.v_len());
        (u, v, p)
    }

    pub fn u_velocity(&self) -> FieldView<'_> {
        let (u, _, _) = self.stokes_split();
        FieldView::new(u, self.dims.n - 1, self.dims.m)
    }

    pub fn v_velocity(&self) -> FieldView<'_> {
        let (_, v, _) = self.stokes_split();
        FieldView::new(v, self.dims.n, self.dims.m - 1)
    }

    pub fn pressure(&self) -> FieldView<'_> {
        let (_, _, p) = self.stokes_split();
        FieldView::new(p, self.dims.n, self.dims.m)
    }

    pub fn pressure_mut(&mut self) -> FieldViewMut<'_> {
        let offset = self.dims.forcing_len();
        FieldViewMut::new(&mut self.stokes[offset..], self.dims.n, self.dims.m)
    }

    pub fn temperature(&self) -> FieldView<'_> {
        FieldView::new(&self.temperature, self.dims.n, self.dims.m)
    }

    pub fn temperature_mut(&mut self) -> FieldViewMut<'_> {
        FieldViewMut::new(&mut self.temperature, self.dims.n, self.dims.m)
    }

    pub fn temperature_boundary(&self) -> FieldView<'_> {
        FieldView::new(&self.temperature_boundary, self.dims.n, 2)
    }

    pub fn temperature_boundary_mut(&mut self) -> FieldViewMut<'_> {
        FieldViewMut::new(&mut self.temperature_boundary, self.dims.n, 2)
    }

    pub fn viscosity(&self) -> FieldView<'_> {
        FieldView::new(&self.viscosity, self.dims.n + 1, self.dims.m + 1)
    }

    pub fn viscosity_mut(&mut self) -> FieldViewMut<'_> {
        FieldViewMut::new(&mut self.viscosity, self.dims.n + 1, self.dims.m + 1)
    }

    pub fn u_forcing(&self) -> FieldView<'_> {
        FieldView::new(&self.forcing[..self.dims.u_len()], self.dims.n - 1, self.dims.m)
    }

    pub fn v_forcing(&self) -> FieldView<'_> {
        FieldView::new(&self.forcing[self.dims.u_len()..], self.dims.n, self.dims.m - 1)
    }

    pub fn u_boundary(&self) -> FieldView<'_> {
        FieldView::new(&self.velocity_boundary[..2 * self.dims.m], 2, self.dims.m)
    }

    pub fn v_boundary(&self) -> FieldView<'_> {
        FieldView::new(&self.velocity_boundary[2 * self.dims.m..], self.dims.n, 2)
    }

    /// Mutable `(uB, vB)` wall-velocity windows.
    pub fn velocity_boundary_mut(&mut self) -> (FieldViewMut<'_>, FieldViewMut<'_>) {
        let (m, n) = (self.dims.m, self.dims.n);
        let (ub, vb) = self.velocity_boundary.split_at_mut(2 * m);
        (FieldViewMut::new(ub, 2, m), FieldViewMut::new(vb, n, 2))
    }

    pub fn stokes_solution(&self) -> &[f64] {
        &self.stokes
    }

    pub fn velocity_fields(&self) -> VelocityFields<'_> {
        VelocityFields {
            u: self.u_velocity(),
            v: self.v_velocity(),
            u_boundary: self.u_boundary(),
            v_boundary: self.v_boundary(),
        }
    }

    /// Split borrow: interior `u`/`v` velocity windows for writing.
    pub fn velocity_mut(&mut self) -> (FieldViewMut<'_>, FieldViewMut<'_>) {
        let (m, n) = (self.dims.m, self.dims.n);
        let (u, rest) = self.stokes.split_at_mut(self.dims.u_len());
        let (v, _) = rest.split_at_mut(self.dims.v_len());
        (FieldViewMut::new(u, n - 1, m), FieldViewMut::new(v, n, m - 1))
    }

    /// Split borrow: `(uF, vF)` for writing plus temperature for reading.
    pub fn forcing_fields(&mut self) -> (FieldViewMut<'_>, FieldViewMut<'_>, FieldView<'_>) {
        let (m, n) = (self.dims.m, self.dims.n);
        let (uf, vf) = self.forcing.split_at_mut(self.dims.u_len());
        (
            FieldViewMut::new(uf, n - 1, m),
            FieldViewMut::new(vf, n, m - 1),
            FieldView::new(&self.temperature, n, m),
        )
    }

    pub fn stokes_fields(&mut self) -> StokesFields<'_> {
        let (m, n) = (self.dims.m, self.dims.n);
        StokesFields {
            solution: &mut self.stokes,
            forcing: &self.forcing,
            velocity_boundary: &self.velocity_boundary,
            viscosity: FieldView::new(&self.viscosity, n + 1, m + 1),
        }
    }

    pub fn transport_fields(&mut self) -> TransportFields<'_> {
        let (m, n) = (self.dims.m, self.dims.n);
        let (u, rest) = self.stokes.split_at(self.dims.u_len());
        let (v, _) = rest.split_at(self.dims.v_len());
        let (ub, vb) = self.velocity_boundary.split_at(2 * m);
        TransportFields {
            velocity: VelocityFields {
                u: FieldView::new(u, n - 1, m),
                v: FieldView::new(v, n, m - 1),
                u_boundary: FieldView::new(ub, 2, m),
                v_boundary: FieldView::new(vb, n, 2),
            },
            temperature: FieldViewMut::new(&mut self.temperature, n, m),
            temperature_boundary: FieldView::new(&self.temperature_boundary, n, 2),
        }
    }
}
