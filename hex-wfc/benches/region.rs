use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};

use hex_wfc::tile::{EdgeLabel, TileDef, TileLibrary};
use hex_wfc::world::WorldMap;

fn demo_library() -> TileLibrary {
    TileLibrary::new(vec![
        TileDef::flat("GRASS", [EdgeLabel::Grass; 6], 300.0),
        TileDef::flat("WATER", [EdgeLabel::Ocean; 6], 40.0),
        TileDef::slope(
            "COAST",
            [
                EdgeLabel::Grass,
                EdgeLabel::Coast,
                EdgeLabel::Coast,
                EdgeLabel::Ocean,
                EdgeLabel::Coast,
                EdgeLabel::Coast,
            ],
            &[hex_wfc::HexDirection::NE],
            1,
            60.0,
        ),
    ])
}

fn populate_origin_radius_6(c: &mut Criterion) {
    c.bench_function("populate_origin_radius_6", |b| {
        b.iter(|| {
            let mut world = WorldMap::new(demo_library(), 6);
            let id = world.create_region(0, 0).unwrap();
            world.populate_region(id, 1).unwrap();
        })
    });
}

fn populate_two_region_stitch(c: &mut Criterion) {
    c.bench_function("populate_two_region_stitch", |b| {
        b.iter(|| {
            let mut world = WorldMap::new(demo_library(), 4);
            let origin = world.create_region(0, 0).unwrap();
            world.populate_region(origin, 1).unwrap();

            let neighbor_grid = world.region(origin).unwrap().grid_coord.neighbors()[0];
            let neighbor_id = world.regions().find(|r| r.grid_coord == neighbor_grid).map(|r| r.id).unwrap();
            world.populate_region(neighbor_id, 2).unwrap();
        })
    });
}

criterion_group!(
    name = region_bench;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = populate_origin_radius_6, populate_two_region_stitch
);
criterion_main!(region_bench);
