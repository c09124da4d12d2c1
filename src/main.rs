use paged_view::*;
use std::time;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn main() -> PagingResult<()> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    println!("== Paging Modes Comparison ==\n");
    for mode in [CacheMode::Manual, CacheMode::Auto, CacheMode::AutoWithPrefetch] {
        println!("Mode: {:?}", mode);
        walk_pages(mode)?;
    }
    println!("\n✓ All walks complete");
    Ok(())
}

fn walk_pages(mode: CacheMode) -> PagingResult<()> {
    let items: Vec<usize> = (0..1_000_000).collect();
    let view = PaginatedView::builder(SequenceSource::from_vec(items))
        .page_size(1_000)
        .options(PagingOptions::uniform(mode))
        .build()?;
    let start = time::Instant::now();
    let mut sum = 0usize;
    loop {
        // два чтения подряд: Manual пересчитывает окно, Auto берёт из кеша
        sum += view.iter()?.map(|n| *n).sum::<usize>();
        let _ = view.current_page()?;
        if !view.next_page()? {
            break;
        }
    }
    println!(
        "  pages: {}, sum: {}, page reloads: {}, execution for: {:?}",
        view.total_page()?,
        sum,
        view.page_cache().reloads(),
        start.elapsed()
    );
    Ok(())
}
