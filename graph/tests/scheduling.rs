mod common;

use std::sync::Arc;

use basalt_core::gpu::{
    HeapKind, ResourceAccess, ResourceLayout, ResourceState, ResourceSync,
};
use basalt_graph::{
    GraphResource, NoDescriptors, PassBuilder, RangeSpec, RenderGraph, ResourceTransition,
};

use common::*;

fn batch_of(graph: &RenderGraph<NullBackend>, name: &str) -> usize {
    for (bi, batch) in graph.batches().iter().enumerate() {
        for &pi in batch.render_passes.iter().chain(batch.compute_passes.iter()) {
            if graph.frame_passes()[pi].name.as_str() == name {
                return bi;
            }
        }
    }
    panic!("pass `{}` was not scheduled", name);
}

fn transition_for<'a>(
    transitions: &'a [ResourceTransition],
    resource_id: u64,
) -> Option<&'a ResourceTransition> {
    transitions.iter().find(|t| t.resource_id == resource_id)
}

fn assert_looped_back(resource: &GraphResource<NullBackend>) {
    let tracker = resource.tracker().lock();
    let flushed = ResourceState::new(
        ResourceAccess::COMMON,
        ResourceLayout::Common,
        ResourceSync::All,
    );
    assert!(
        tracker.segments().iter().all(|s| s.state == flushed),
        "resource {:?} did not loop back to (Common, Common, All)",
        resource.name()
    );
}

#[test]
fn buffer_upload_then_sampled_read() {
    let device = NullDevice::new(true);
    let mut graph = RenderGraph::<NullBackend>::new();

    let staging = make_buffer(&device, "staging", 65536, HeapKind::Upload);
    let buffer = make_buffer(&device, "mesh_data", 65536, HeapKind::DeviceLocal);
    graph.add_resource(staging.clone());
    graph.add_resource(buffer.clone());

    let dst = buffer.clone();
    let src = staging.clone();
    let upload = test_pass(TestPass::with_immediate(Box::new(move |ctx| {
        ctx.list.copy_buffer_region(&dst, 0, &src, 0, 65536)
    })));
    graph
        .add_render_pass("upload", upload, PassBuilder::render())
        .unwrap();

    let consume = test_pass(TestPass::retained());
    graph
        .add_render_pass(
            "consume",
            consume,
            PassBuilder::render().with_shader_resource(&buffer, RangeSpec::Whole),
        )
        .unwrap();

    graph.compile_structural().unwrap();
    graph.compile_frame(0, &NoDescriptors).unwrap();

    let upload_batch = batch_of(&graph, "upload");
    let consume_batch = batch_of(&graph, "consume");
    assert!(upload_batch < consume_batch);

    // Upload sees the buffer fresh: common access, no prior sync.
    let to_copy_dst = transition_for(
        &graph.batches()[upload_batch].render_transitions,
        buffer.global_id(),
    )
    .expect("upload transitions the destination buffer");
    assert_eq!(to_copy_dst.prev, ResourceState::initial());
    assert_eq!(
        to_copy_dst.next,
        ResourceState::new(
            ResourceAccess::COPY_DEST,
            ResourceLayout::CopyDest,
            ResourceSync::Copy
        )
    );

    let to_srv = transition_for(
        &graph.batches()[consume_batch].render_transitions,
        buffer.global_id(),
    )
    .expect("consumer transitions the buffer to shader resource");
    assert_eq!(to_srv.prev, to_copy_dst.next);
    assert_eq!(
        to_srv.next,
        ResourceState::new(
            ResourceAccess::SHADER_RESOURCE,
            ResourceLayout::ShaderResource,
            ResourceSync::AllShading
        )
    );

    // Everything on the graphics queue: no compute work, no cross-queue waits.
    for batch in graph.batches() {
        assert!(batch.compute_passes.is_empty());
        assert!(batch.compute_wait_on_render_before_transition.is_none());
        assert!(batch.render_wait_on_compute_before_transition.is_none());
    }

    assert_looped_back(&buffer);
    assert_looped_back(&staging);
}

#[test]
fn cross_queue_producer_sets_wait() {
    let device = NullDevice::new(true);
    let mut graph = RenderGraph::<NullBackend>::new();

    let texture = make_texture(&device, "lighting", 1, 1);
    graph.add_resource(texture.clone());

    graph
        .add_compute_pass(
            "light_binning",
            test_pass(TestPass::retained()),
            PassBuilder::compute().with_unordered_access(&texture, RangeSpec::Whole),
        )
        .unwrap();
    graph
        .add_render_pass(
            "shading",
            test_pass(TestPass::retained()),
            PassBuilder::render().with_shader_resource(&texture, RangeSpec::Whole),
        )
        .unwrap();

    graph.compile_structural().unwrap();
    graph.compile_frame(0, &NoDescriptors).unwrap();

    let producer_batch = batch_of(&graph, "light_binning");
    let consumer_batch = batch_of(&graph, "shading");
    assert!(producer_batch < consumer_batch);
    assert!(graph.batches()[producer_batch]
        .compute_passes
        .contains(&0));
    assert!(!graph.batches()[consumer_batch].render_passes.is_empty());

    // The UAV -> SRV transition has a compute-compatible source sync, so it
    // stays on the consuming graphics queue.
    let transition = transition_for(
        &graph.batches()[consumer_batch].render_transitions,
        texture.global_id(),
    )
    .expect("consumer transitions the texture");
    assert_eq!(transition.prev.sync, ResourceSync::ComputeShading);
    assert!(transition.prev.access.contains(ResourceAccess::UNORDERED_ACCESS));
    assert!(transition
        .next
        .access
        .contains(ResourceAccess::SHADER_RESOURCE));

    // The graphics batch waits on the compute batch's completion value and
    // that batch actually signals it.
    let producer = &graph.batches()[producer_batch];
    let consumer = &graph.batches()[consumer_batch];
    assert!(producer.compute_completion_signal);
    let wait = consumer
        .render_wait_on_compute_before_transition
        .or(consumer.render_wait_on_compute_before_execution)
        .expect("consumer batch waits on the producer");
    assert_eq!(wait, producer.compute_completion_fence_value);

    assert_looped_back(&texture);
}

#[test]
fn uav_write_then_read_forces_split() {
    let device = NullDevice::new(true);
    let mut graph = RenderGraph::<NullBackend>::new();

    let buffer = make_buffer(&device, "histogram", 4096, HeapKind::DeviceLocal);
    graph.add_resource(buffer.clone());

    graph
        .add_compute_pass(
            "build_histogram",
            test_pass(TestPass::retained()),
            PassBuilder::compute().with_unordered_access(&buffer, RangeSpec::Whole),
        )
        .unwrap();
    graph
        .add_compute_pass(
            "analyze_histogram",
            test_pass(TestPass::retained()),
            PassBuilder::compute().with_shader_resource(&buffer, RangeSpec::Whole),
        )
        .unwrap();

    graph.compile_structural().unwrap();
    graph.compile_frame(0, &NoDescriptors).unwrap();

    let writer_batch = batch_of(&graph, "build_histogram");
    let reader_batch = batch_of(&graph, "analyze_histogram");
    assert_ne!(writer_batch, reader_batch);

    let transition = transition_for(
        &graph.batches()[reader_batch].compute_transitions,
        buffer.global_id(),
    )
    .expect("reader batch transitions the buffer on the compute queue");
    assert!(transition.prev.access.contains(ResourceAccess::UNORDERED_ACCESS));
    assert!(transition
        .next
        .access
        .contains(ResourceAccess::SHADER_RESOURCE));
}

#[test]
fn internal_transition_quarantines_batch() {
    let device = NullDevice::new(true);
    let mut graph = RenderGraph::<NullBackend>::new();

    let texture = make_texture(&device, "streamed", 4, 1);
    graph.add_resource(texture.clone());

    let copy_dst_state = ResourceState::new(
        ResourceAccess::COPY_DEST,
        ResourceLayout::CopyDest,
        ResourceSync::Copy,
    );
    graph
        .add_render_pass(
            "stream_in",
            test_pass(TestPass::retained()),
            PassBuilder::render().requires_internal_transition(
                &texture,
                RangeSpec::Whole,
                copy_dst_state,
            ),
        )
        .unwrap();
    graph
        .add_render_pass(
            "sample",
            test_pass(TestPass::retained()),
            PassBuilder::render().with_shader_resource(&texture, RangeSpec::Whole),
        )
        .unwrap();

    graph.compile_structural().unwrap();
    graph.compile_frame(0, &NoDescriptors).unwrap();

    let stream_batch = batch_of(&graph, "stream_in");
    let sample_batch = batch_of(&graph, "sample");
    assert_ne!(stream_batch, sample_batch);

    // The consumer picks up from the state the pass left internally.
    let transition = transition_for(
        &graph.batches()[sample_batch].render_transitions,
        texture.global_id(),
    )
    .expect("sample transitions the streamed texture");
    assert_eq!(transition.prev, copy_dst_state);
}

#[test]
fn render_to_compute_never_shares_a_batch() {
    let device = NullDevice::new(true);
    let mut graph = RenderGraph::<NullBackend>::new();

    let target = make_texture(&device, "scene_color", 1, 1);
    graph.add_resource(target.clone());

    graph
        .add_render_pass(
            "geometry",
            test_pass(TestPass::retained()),
            PassBuilder::render().with_render_target(&target, RangeSpec::Whole),
        )
        .unwrap();
    graph
        .add_compute_pass(
            "luminance",
            test_pass(TestPass::retained()),
            PassBuilder::compute().with_shader_resource(&target, RangeSpec::Whole),
        )
        .unwrap();

    graph.compile_structural().unwrap();
    graph.compile_frame(0, &NoDescriptors).unwrap();

    assert_ne!(batch_of(&graph, "geometry"), batch_of(&graph, "luminance"));

    // The RenderTarget source sync cannot be expressed on the compute
    // queue; the transition runs as the graphics batch winds down.
    let geometry_batch = &graph.batches()[batch_of(&graph, "geometry")];
    let handed_off = transition_for(&geometry_batch.batch_end_transitions, target.global_id());
    assert!(
        handed_off.is_some(),
        "render-target to compute hand-off runs on the producing graphics queue"
    );
    assert_eq!(
        handed_off.unwrap().prev.sync,
        ResourceSync::RenderTarget
    );
}

#[test]
fn alias_group_schedules_as_one_resource() {
    let device = NullDevice::new(true);
    let mut graph = RenderGraph::<NullBackend>::new();

    let a = make_texture(&device, "bloom_scratch", 1, 1);
    let b = make_texture(&device, "ssr_scratch", 1, 1);
    a.add_alias(&b);
    graph.add_resource(a.clone());
    graph.add_resource(b.clone());

    graph
        .add_compute_pass(
            "bloom",
            test_pass(TestPass::retained()),
            PassBuilder::compute().with_unordered_access(&a, RangeSpec::Whole),
        )
        .unwrap();
    graph
        .add_render_pass(
            "ssr_resolve",
            test_pass(TestPass::retained()),
            PassBuilder::render().with_shader_resource(&b, RangeSpec::Whole),
        )
        .unwrap();

    graph.compile_structural().unwrap();
    graph.compile_frame(0, &NoDescriptors).unwrap();

    assert_ne!(batch_of(&graph, "bloom"), batch_of(&graph, "ssr_resolve"));
    // The aliased write orders the read after it even though the passes
    // touch different resources.
    assert!(batch_of(&graph, "bloom") < batch_of(&graph, "ssr_resolve"));
}

#[test]
fn matching_state_emits_no_transition() {
    let device = NullDevice::new(true);
    let mut graph = RenderGraph::<NullBackend>::new();

    let texture = make_texture(&device, "env_map", 1, 1);
    graph.add_resource(texture.clone());

    for name in ["sky", "fog"] {
        graph
            .add_render_pass(
                name,
                test_pass(TestPass::retained()),
                PassBuilder::render().with_shader_resource(&texture, RangeSpec::Whole),
            )
            .unwrap();
    }

    graph.compile_structural().unwrap();
    graph.compile_frame(0, &NoDescriptors).unwrap();

    // Identical requirements pack into one batch with a single transition.
    assert_eq!(batch_of(&graph, "sky"), batch_of(&graph, "fog"));
    let batch = &graph.batches()[batch_of(&graph, "sky")];
    let count = batch
        .render_transitions
        .iter()
        .filter(|t| t.resource_id == texture.global_id())
        .count();
    assert_eq!(count, 1);
}

#[test]
fn conflicting_immediate_requirements_split_the_pass() {
    let device = NullDevice::new(true);
    let mut graph = RenderGraph::<NullBackend>::new();

    let staging = make_buffer(&device, "staging", 1024, HeapKind::Upload);
    let buffer = make_buffer(&device, "instances", 1024, HeapKind::DeviceLocal);
    graph.add_resource(staging.clone());
    graph.add_resource(buffer.clone());

    // Statically a shader-resource read; dynamically also a copy target for
    // the same bytes. The two states conflict, so the pass splits.
    let dst = buffer.clone();
    let src = staging.clone();
    let pass = test_pass(TestPass {
        execute: None,
        immediate: Some(Box::new(move |ctx| {
            ctx.list.copy_buffer_region(&dst, 0, &src, 0, 1024)
        })),
    });
    graph
        .add_render_pass(
            "instancing",
            pass,
            PassBuilder::render().with_shader_resource(&buffer, RangeSpec::Whole),
        )
        .unwrap();

    graph.compile_structural().unwrap();
    graph.compile_frame(0, &NoDescriptors).unwrap();

    let split: Vec<_> = graph
        .frame_passes()
        .iter()
        .filter(|fp| fp.name.as_str() == "instancing")
        .collect();
    assert_eq!(split.len(), 2);
    assert!(split[0].run.contains(basalt_graph::PassRunMask::IMMEDIATE));
    assert!(!split[0].run.contains(basalt_graph::PassRunMask::RETAINED));
    assert!(split[1].run.contains(basalt_graph::PassRunMask::RETAINED));
    assert!(split[1].bytecode.is_empty());

    // The immediate half executes before the retained half.
    let immediate_batch = graph
        .batches()
        .iter()
        .position(|b| b.render_passes.contains(&0))
        .unwrap();
    let retained_batch = graph
        .batches()
        .iter()
        .position(|b| b.render_passes.contains(&1))
        .unwrap();
    assert!(immediate_batch < retained_batch);
}

#[test]
fn front_inserted_pass_sequences_first() {
    let device = NullDevice::new(true);
    let mut graph = RenderGraph::<NullBackend>::new();

    let staging = make_buffer(&device, "staging", 1024, HeapKind::Upload);
    let buffer = make_buffer(&device, "scene_constants", 1024, HeapKind::DeviceLocal);
    graph.add_resource(staging.clone());
    graph.add_resource(buffer.clone());

    graph
        .add_render_pass(
            "draw_scene",
            test_pass(TestPass::retained()),
            PassBuilder::render().with_constant_buffer(&buffer),
        )
        .unwrap();

    // The upload pass is registered last but pinned to the front, so its
    // copy writes the constants before the consumer reads them.
    let dst = buffer.clone();
    let src = staging.clone();
    graph
        .add_render_pass_front(
            "upload",
            test_pass(TestPass::with_immediate(Box::new(move |ctx| {
                ctx.list.copy_buffer_region(&dst, 0, &src, 0, 1024)
            }))),
            PassBuilder::render(),
        )
        .unwrap();

    graph.compile_structural().unwrap();
    graph.compile_frame(0, &NoDescriptors).unwrap();

    assert_eq!(graph.frame_passes()[0].name.as_str(), "upload");
    assert!(batch_of(&graph, "upload") < batch_of(&graph, "draw_scene"));
}

#[test]
fn fence_values_increase_across_batches_and_frames() {
    let device = NullDevice::new(true);
    let mut graph = RenderGraph::<NullBackend>::new();

    let texture = make_texture(&device, "ping", 1, 1);
    let buffer = make_buffer(&device, "pong", 512, HeapKind::DeviceLocal);
    graph.add_resource(texture.clone());
    graph.add_resource(buffer.clone());

    graph
        .add_compute_pass(
            "simulate",
            test_pass(TestPass::retained()),
            PassBuilder::compute().with_unordered_access(&buffer, RangeSpec::Whole),
        )
        .unwrap();
    graph
        .add_render_pass(
            "draw_particles",
            test_pass(TestPass::retained()),
            PassBuilder::render()
                .with_shader_resource(&buffer, RangeSpec::Whole)
                .with_render_target(&texture, RangeSpec::Whole),
        )
        .unwrap();

    graph.compile_structural().unwrap();

    let mut last_graphics = 0u64;
    let mut last_compute = 0u64;
    for frame in 0..3u32 {
        graph.compile_frame(frame, &NoDescriptors).unwrap();
        for batch in graph.batches() {
            if batch.render_transition_fence_value != 0 {
                assert!(batch.render_transition_fence_value > last_graphics);
                assert!(batch.render_completion_fence_value > batch.render_transition_fence_value);
                last_graphics = batch.render_completion_fence_value;
            }
            if batch.compute_transition_fence_value != 0 {
                assert!(batch.compute_transition_fence_value > last_compute);
                assert!(batch.compute_completion_fence_value > batch.compute_transition_fence_value);
                last_compute = batch.compute_completion_fence_value;
            }
        }
    }
}

#[test]
fn every_pass_is_placed_exactly_once() {
    let device = NullDevice::new(true);
    let mut graph = RenderGraph::<NullBackend>::new();

    let resources: Vec<Arc<GraphResource<NullBackend>>> = (0..4)
        .map(|i| make_texture(&device, &format!("rt{}", i), 1, 1))
        .collect();
    for r in &resources {
        graph.add_resource(r.clone());
    }

    for (i, r) in resources.iter().enumerate() {
        graph
            .add_render_pass(
                &format!("produce{}", i),
                test_pass(TestPass::retained()),
                PassBuilder::render().with_render_target(r, RangeSpec::Whole),
            )
            .unwrap();
    }
    graph
        .add_compute_pass(
            "combine",
            test_pass(TestPass::retained()),
            resources.iter().fold(PassBuilder::compute(), |b, r| {
                b.with_shader_resource(r, RangeSpec::Whole)
            }),
        )
        .unwrap();

    graph.compile_structural().unwrap();
    graph.compile_frame(0, &NoDescriptors).unwrap();

    let placed: usize = graph
        .batches()
        .iter()
        .map(|b| b.render_passes.len() + b.compute_passes.len())
        .sum();
    assert_eq!(placed, graph.frame_passes().len());

    for r in &resources {
        assert_looped_back(r);
    }
}
