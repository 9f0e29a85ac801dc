use kornia_group_reduce::*;

const ROWS: usize = 4;
const PROBLEM_SIZE: usize = 5;

fn print_segments(input: &[bool]) {
    for (row, segment) in input.chunks(PROBLEM_SIZE).enumerate() {
        let bits: String = segment.iter().map(|&b| if b { '1' } else { '0' }).collect();
        println!("  row {row}: {bits}");
    }
}

fn main() -> Result<()> {
    env_logger::init();

    println!("=== Segment Minimum ===\n");

    let input = [
        false, true, true, false, false, //
        true, false, true, false, true, //
        true, true, true, true, true, //
        true, true, false, false, false,
    ];
    println!("Input ({ROWS} segments of {PROBLEM_SIZE}):");
    print_segments(&input);

    let geometry = BlockGeometry::new(ROWS, DEFAULT_LANE_WIDTH);
    let result = segment_reduce_with_stats(
        &input,
        PROBLEM_SIZE,
        &geometry,
        &Min::with_identity(true),
    )?;
    log::info!(
        "reduced {} segments in {} block(s)",
        result.values.len(),
        result.blocks
    );

    println!(
        "\n[{}] block {}x{}, lane width {}",
        Backend::Cpu,
        geometry.rows,
        geometry.cols,
        geometry.lane_width
    );
    for (row, value) in result.values.iter().enumerate() {
        println!("  output[{row}] = {}", *value as u8);
    }
    println!(
        "  {} threads, {} barrier rounds, {} shuffle rounds, {} scratch writes",
        result.stats.threads,
        result.stats.barrier_rounds,
        result.stats.shuffle_rounds,
        result.stats.scratch_writes
    );

    #[cfg(feature = "cuda")]
    match init_cuda_runtime() {
        Ok(runtime) => run_gpu(&input, &geometry, &runtime)?,
        Err(e) => println!("\nCUDA not available: {e}"),
    }

    #[cfg(all(feature = "wgpu", not(feature = "cuda")))]
    match init_wgpu_runtime() {
        Ok(runtime) => run_gpu(&input, &geometry, &runtime)?,
        Err(e) => println!("\nWGPU not available: {e}"),
    }

    Ok(())
}

#[cfg(feature = "cuda")]
type GpuRuntime = CudaRuntime;

#[cfg(all(feature = "wgpu", not(feature = "cuda")))]
type GpuRuntime = WgpuRuntime;

#[cfg(any(feature = "cuda", feature = "wgpu"))]
fn run_gpu(
    input: &[bool],
    geometry: &BlockGeometry,
    runtime: &RuntimeContext<GpuRuntime>,
) -> Result<()> {
    let as_u32: Vec<u32> = input.iter().map(|&b| b as u32).collect();
    let input_gpu = to_device(&as_u32, vec![ROWS, PROBLEM_SIZE], runtime)?;
    let mins = segment_reduce_execute::<GpuRuntime, u32, MinOp>(&input_gpu, PROBLEM_SIZE, geometry, runtime)?;

    println!("\n[{}]", runtime.backend_name());
    for (row, value) in mins.iter().enumerate() {
        println!("  output[{row}] = {value}");
    }
    log::info!("gpu results match cpu: {}", {
        let cpu: Vec<u32> = input
            .chunks(PROBLEM_SIZE)
            .map(|s| s.iter().all(|&b| b) as u32)
            .collect();
        cpu == mins
    });
    Ok(())
}
