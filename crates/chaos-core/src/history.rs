//! Host-side header table and point storage for the whole particle population

use crate::{Attractor, Bounds, Point, RingBufferHeader};
use anyhow::{ensure, Context, Result};
use rand::Rng;

/// All particle histories: one header per particle plus the flat point storage
/// they index into. Built once on the host, then handed to the GPU.
#[derive(Clone, Debug)]
pub struct ParticleHistory {
    headers: Vec<RingBufferHeader>,
    points: Vec<Point>,
    capacity: u32,
}

impl ParticleHistory {
    /// Histories with no samples
    pub fn empty(particle_count: u32, capacity: u32) -> Result<Self> {
        ensure!(particle_count > 0, "particle count must be non-zero");
        ensure!(capacity > 0, "ring buffer capacity must be non-zero");
        let slots = (particle_count as usize)
            .checked_mul(capacity as usize)
            .filter(|&n| n <= u32::MAX as usize)
            .context("point storage does not fit 32-bit slot indices")?;

        let headers = (0..particle_count)
            .map(|i| RingBufferHeader::empty(i, capacity))
            .collect();

        Ok(Self {
            headers,
            points: vec![Point::ZERO; slots],
            capacity,
        })
    }

    /// Histories holding one sample each, drawn uniformly from `bounds`
    pub fn seeded(
        particle_count: u32,
        capacity: u32,
        bounds: &Bounds,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        ensure!(bounds.is_valid(), "invalid spawn bounds {bounds:?}");
        let mut history = Self::empty(particle_count, capacity)?;
        for i in 0..particle_count {
            let p = bounds.sample(rng);
            history.append(i, p.into());
        }
        Ok(history)
    }

    pub fn particle_count(&self) -> u32 {
        self.headers.len() as u32
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn headers(&self) -> &[RingBufferHeader] {
        &self.headers
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn header(&self, particle: u32) -> &RingBufferHeader {
        &self.headers[particle as usize]
    }

    pub fn append(&mut self, particle: u32, value: Point) {
        self.headers[particle as usize].append(&mut self.points, value);
    }

    pub fn read(&self, particle: u32, k: u32) -> Option<Point> {
        self.headers[particle as usize].read(&self.points, k)
    }

    pub fn newest(&self, particle: u32) -> Option<Point> {
        self.read(particle, 0)
    }

    /// Advance every particle one step, the same way the GPU update kernel does.
    ///
    /// Particles with no samples are left untouched.
    pub fn advance(&mut self, attractor: &impl Attractor) {
        for header in &mut self.headers {
            if let Some(current) = header.read(&self.points, 0) {
                let next = attractor.step(current.to_vec3());
                header.append(&mut self.points, next.into());
            }
        }
    }

    pub fn check_invariants(&self) -> Result<()> {
        for (i, header) in self.headers.iter().enumerate() {
            ensure!(
                header.base == i as u32 * self.capacity && header.capacity == self.capacity,
                "header {i} does not own slice {}..{}",
                i as u32 * self.capacity,
                (i as u32 + 1) * self.capacity
            );
            header
                .check_invariants()
                .with_context(|| format!("particle {i}"))?;
        }
        Ok(())
    }

    /// Rebuild from raw GPU contents (used for readback diagnostics)
    pub fn from_parts(headers: Vec<RingBufferHeader>, points: Vec<Point>) -> Result<Self> {
        let capacity = headers.first().map(|h| h.capacity).context("no headers")?;
        ensure!(
            points.len() == headers.len() * capacity as usize,
            "{} points cannot back {} headers of capacity {}",
            points.len(),
            headers.len(),
            capacity
        );
        let history = Self {
            headers,
            points,
            capacity,
        };
        history.check_invariants()?;
        Ok(history)
    }

    pub fn header_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.headers)
    }

    pub fn point_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Lorenz;
    use glam::Vec3;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_seeded_history_has_one_sample_per_particle() {
        let mut rng = StdRng::seed_from_u64(42);
        let bounds = Bounds::new(Vec3::new(-30.0, 0.0, 0.0), Vec3::new(30.0, 0.0, 55.0));
        let history = ParticleHistory::seeded(16, 10, &bounds, &mut rng).unwrap();

        history.check_invariants().unwrap();
        for i in 0..16 {
            let header = history.header(i);
            assert_eq!(header.base, 10 * i);
            assert_eq!(header.count, 1);
            assert_eq!(header.write_index, header.base);
            assert_eq!(header.read_index, header.base);
            assert!(bounds.contains(history.newest(i).unwrap().to_vec3()));
        }
    }

    #[test]
    fn test_four_particles_capacity_three_keeps_last_three() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut history = ParticleHistory::seeded(4, 3, &Bounds::UNIT_CUBE, &mut rng).unwrap();

        let value = |particle: u32, n: u32| Point::new(particle as f32, n as f32, 0.5);
        for n in 1..=5 {
            for particle in 0..4 {
                history.append(particle, value(particle, n));
            }
        }

        history.check_invariants().unwrap();
        for particle in 0..4 {
            assert_eq!(history.header(particle).count, 3);
            assert_eq!(history.read(particle, 0), Some(value(particle, 5)));
            assert_eq!(history.read(particle, 1), Some(value(particle, 4)));
            assert_eq!(history.read(particle, 2), Some(value(particle, 3)));
            assert_eq!(history.read(particle, 3), None);
        }
    }

    #[test]
    fn test_advance_appends_attractor_step() {
        let mut rng = StdRng::seed_from_u64(3);
        let bounds = Bounds::new(Vec3::splat(1.0), Vec3::splat(2.0));
        let mut history = ParticleHistory::seeded(3, 4, &bounds, &mut rng).unwrap();
        let lorenz = Lorenz::default();
        let before: Vec<Point> = (0..3).map(|i| history.newest(i).unwrap()).collect();

        history.advance(&lorenz);

        for i in 0..3 {
            assert_eq!(history.header(i).count, 2);
            assert_eq!(history.read(i, 1), Some(before[i as usize]));
            let expected = lorenz.step(before[i as usize].to_vec3());
            assert_eq!(history.newest(i).unwrap().to_vec3(), expected);
        }
    }

    #[test]
    fn test_zero_sizes_are_rejected() {
        assert!(ParticleHistory::empty(0, 10).is_err());
        assert!(ParticleHistory::empty(10, 0).is_err());
    }

    #[test]
    fn test_from_parts_rejects_mismatched_storage() {
        let history = ParticleHistory::empty(2, 3).unwrap();
        let headers = history.headers().to_vec();
        assert!(ParticleHistory::from_parts(headers.clone(), vec![Point::ZERO; 5]).is_err());
        assert!(ParticleHistory::from_parts(headers, vec![Point::ZERO; 6]).is_ok());
    }

    #[test]
    fn test_byte_views_cover_all_storage() {
        let history = ParticleHistory::empty(5, 7).unwrap();
        assert_eq!(history.header_bytes().len(), 5 * 32);
        assert_eq!(history.point_bytes().len(), 5 * 7 * 16);
    }
}
